//! Impls - 実装（開発用・テスト用）
//!
//! このモジュールには ports の実装を含めます。
//!
//! # 含まれる実装
//! - **InMemoryAssignmentStore**: assignment の正本（テスト・シード用）
//! - **InMemoryExchangeJobStore**: 非同期ジョブテーブル
//! - **InMemoryContentStore**: エクスチェンジ対象のコンテンツ
//! - **AllowAll / RoleAuthorizer**: Authorizer
//! - **Noop / Recording / Tracing**: ActivitySink
//!
//! # 本番用実装
//! SQL バックエンドは別クレートに配置する想定です（同じ port 契約を満たすこと）。

pub mod authorizers;
pub mod inmem_assignments;
pub mod inmem_content;
pub mod inmem_jobs;
pub mod sinks;

// 主要な型を再エクスポート
pub use self::authorizers::{AllowAll, RoleAuthorizer};
pub use self::inmem_assignments::InMemoryAssignmentStore;
pub use self::inmem_content::InMemoryContentStore;
pub use self::inmem_jobs::InMemoryExchangeJobStore;
pub use self::sinks::{NoopActivitySink, RecordingActivitySink, TracingActivitySink};
