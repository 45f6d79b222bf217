//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! 各 trait は外部システム（assignment テーブル、コンテンツ CMS、監査ログなど）への
//! インターフェースを提供し、実装の詳細を隠蔽します。
//!
//! # 設計原則
//! - AssignmentStore が source of truth（正本）
//! - 認可は不透明な bool（Authorizer）
//! - 監査ログは best-effort（ActivitySink）

pub mod activity_sink;
pub mod assignment_store;
pub mod authorizer;
pub mod clock;
pub mod content_store;
pub mod id_generator;
pub mod job_store;

// 主要な trait を再エクスポート
pub use self::activity_sink::{ActivitySink, SinkError};
pub use self::assignment_store::{
    AssignmentStore, CreateOutcome, ListFilter, ListOptions, ListPage, MAX_PER_PAGE, SortField,
    SortOrder,
};
pub use self::authorizer::{Authorizer, TRANSLATIONS_RESOURCE, capability};
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::content_store::{ContentStore, SourceField, SourceFilter, TargetField, TargetWrite};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::job_store::ExchangeJobStore;
