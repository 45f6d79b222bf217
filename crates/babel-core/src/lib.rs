//! babel-core
//!
//! Core building blocks for the translation workflow.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（assignment, state, transition, exchange, errors, events, context）
//! - **contracts**: クライアントと共有する語彙（queue/content/due state, drift metadata）
//! - **ports**: 抽象化レイヤー（AssignmentStore, ExchangeJobStore, ContentStore, Authorizer, など）
//! - **impls**: 実装（in-memory store, authorizer, activity sink）
//! - **app**: アプリケーションロジック（workflow, queue view, dashboard, exchange, endpoints, builder）
//! - **config**: 実行時設定
//! - **observability**: tracing subscriber の初期化

pub mod app;
pub mod config;
pub mod contracts;
pub mod domain;
pub mod impls;
pub mod observability;
pub mod ports;
