use std::error::Error;

use serde_json::Value;

use babel_core::app::{
    CoreBuilder, ExportCall, ImportCall, MyWorkRequest, QueueRequest, TemplateRequest,
};
use babel_core::domain::{
    AssignmentDraft, ErrorEnvelope, ExchangeOptions, Principal, Priority, RequestContext,
};
use babel_core::impls::{InMemoryContentStore, TracingActivitySink};
use babel_core::observability::init_tracing;
use babel_core::ports::SourceFilter;

fn envelope_error(err: ErrorEnvelope) -> Box<dyn Error> {
    format!("{} ({})", err.error.message, err.error.text_code).into()
}

fn print_section(title: &str, value: &Value) -> Result<(), Box<dyn Error>> {
    println!("== {title} ==");
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_tracing(None, false);

    // (A) 翻訳対象のコンテンツを用意（es のレコードだけ既存）
    let content = InMemoryContentStore::new();
    content
        .put_source("pages", "page_home", "tg_home", "en", "title", "Welcome home")
        .await;
    content
        .put_source("pages", "page_home", "tg_home", "en", "summary", "Everything in one place")
        .await;
    content
        .put_target_record("pages", "tg_home", "es", "page_home_es")
        .await;

    // (B) in-memory のスタックを組み立てる
    let core = CoreBuilder::new()
        .with_content(content)
        .with_sink(TracingActivitySink)
        .build()?;

    let manager = RequestContext::new(Principal::new("manager-1"));
    let translator = RequestContext::new(Principal::new("translator-1"));

    // (C) assignment を作成（同じキーの二度目は再利用される）
    let mut ids = Vec::new();
    for locale in ["es", "fr"] {
        let draft = AssignmentDraft {
            translation_group_id: "tg_home".into(),
            entity_type: "pages".into(),
            source_record_id: "page_home".into(),
            source_locale: "en".into(),
            target_locale: locale.into(),
            source_title: "Welcome home".into(),
            priority: Some(Priority::High),
            ..Default::default()
        };
        let outcome = core.workflow.create_or_reuse(&manager, draft.clone()).await?;
        let again = core.workflow.create_or_reuse(&manager, draft).await?;
        println!(
            "{locale}: id={} created={} reused={}",
            outcome.assignment.id, outcome.created, !again.created
        );
        ids.push(outcome.assignment.id);
    }

    // (D) es を assign → claim → submit_review まで進める
    let es = &ids[0];
    core.workflow.assign(&manager, es, "translator-1").await?;
    core.workflow.claim(&translator, es).await?;
    let in_review = core.workflow.submit_review(&translator, es).await?;
    println!("es: status={} version={}", in_review.status, in_review.version);

    let my_work = core
        .endpoints
        .my_work(
            &translator,
            &MyWorkRequest {
                user_id: "translator-1".into(),
                ..Default::default()
            },
        )
        .await
        .map_err(envelope_error)?;
    print_section("my work", &my_work)?;

    let review_queue = core
        .endpoints
        .queue_list(
            &manager,
            &QueueRequest {
                review: true,
                ..Default::default()
            },
        )
        .await
        .map_err(envelope_error)?;
    print_section("review queue", &review_queue)?;

    // (E) export → 翻訳を埋める → apply
    let template = core
        .endpoints
        .exchange_template(&TemplateRequest {
            format: "csv".into(),
        })
        .map_err(envelope_error)?;
    print_section("csv template", &template)?;

    let export = core
        .endpoints
        .exchange_export(
            &manager,
            &ExportCall {
                filter: SourceFilter {
                    resources: vec!["pages".into()],
                    ..Default::default()
                },
                target_locales: vec!["es".into()],
                format: "json".into(),
            },
        )
        .await
        .map_err(envelope_error)?;
    let mut rows: Vec<Value> = serde_json::from_str(export["body"].as_str().unwrap_or("[]"))?;
    for row in &mut rows {
        let translated = match row["field_path"].as_str() {
            Some("title") => "Bienvenido a casa",
            _ => "Todo en un solo lugar",
        };
        row["translated_text"] = Value::from(translated);
    }

    let report = core
        .endpoints
        .exchange_apply(
            &manager,
            ImportCall {
                format: "json".into(),
                body: serde_json::to_string(&rows)?,
                options: ExchangeOptions {
                    continue_on_error: true,
                    ..Default::default()
                },
            },
        )
        .await
        .map_err(envelope_error)?;
    print_section("apply report", &report["summary"])?;

    // (F) approve → publish して dashboard を確認
    core.workflow.approve(&manager, es).await?;
    core.workflow.publish(&manager, es).await?;

    let dashboard = core.endpoints.dashboard(&manager).await.map_err(envelope_error)?;
    print_section("dashboard", &dashboard)?;

    Ok(())
}
