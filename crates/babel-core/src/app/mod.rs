//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **CoreBuilder**: サービスの構築とワイヤリング
//! - **WorkflowService**: 状態遷移（assign → claim → review → approve → publish）
//! - **QueueViewService**: my-work / queue の読み取り射影
//! - **DashboardService**: 集計スナップショット
//! - **ExchangeService**: インポート / エクスポートと非同期ジョブ
//! - **Gate**: capability チェックと review_actions
//! - **KeyedLocks**: assignment 単位の直列化
//! - **ActivityEmitter**: 監査イベントの発行
//! - **Endpoints**: 論理ワイヤ表面

pub mod activity;
pub mod builder;
pub mod dashboard;
pub mod endpoints;
pub mod exchange;
pub mod gate;
pub mod key_lock;
pub mod pager;
pub mod queue_view;
pub mod workflow;

// 主要な型を再エクスポート
pub use self::activity::ActivityEmitter;
pub use self::builder::{BuildError, Core, CoreBuilder};
pub use self::dashboard::{DashboardService, DashboardSnapshot};
pub use self::endpoints::{Endpoints, ExportCall, ImportCall, JobRequest, TemplateRequest};
pub use self::exchange::{ExchangeService, ExportPayload, ExportRequest};
pub use self::gate::{ActionState, Capabilities, Gate, ReviewActions};
pub use self::queue_view::{
    MyWorkEnvelope, MyWorkRequest, QueueEnvelope, QueueRequest, QueueRow, QueueViewService,
};
pub use self::workflow::WorkflowService;
