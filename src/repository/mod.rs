// ==========================================
// 齐套作业排产系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// 约束: 所有仓储共享同一个 Arc<Mutex<Connection>>
// ==========================================

pub mod delay_repo;
pub mod error;
pub mod job_repo;
pub mod scenario_repo;
pub mod shift_repo;

// 重导出核心仓储
pub use delay_repo::DelayRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use job_repo::{JobRepository, TxJobStore};
pub use scenario_repo::ScenarioRepository;
pub use shift_repo::ShiftRepository;
