use anyhow::Context;
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use eziogram::{
    config::Config,
    models::RelationKind,
    state::AppState,
};

const USAGE: &str =
    "usage: eziogram <like-post|like-reel|like-story|follow> <target-id> [--count N] [--toggle]";

#[derive(Debug)]
struct Args {
    kind: RelationKind,
    target_id: String,
    count: u64,
    toggle: bool,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> anyhow::Result<Args> {
    let kind = args.next().context(USAGE)?.parse::<RelationKind>()?;
    let target_id = args.next().context(USAGE)?;
    let mut count = 0;
    let mut toggle = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--toggle" => toggle = true,
            "--count" => {
                count = args
                    .next()
                    .context("--count needs a value")?
                    .parse::<u64>()
                    .context("--count must be a non-negative number")?;
            }
            other => anyhow::bail!("unexpected argument `{}`\n{}", other, USAGE),
        }
    }

    Ok(Args {
        kind,
        target_id,
        count,
        toggle,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置
    let config = Config::from_env()?;

    // 初始化日志
    let json_logs = config.json_logs();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "eziogram={}",
            config.log_level
        )))
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(tracing_subscriber::fmt::layer))
        .init();

    let args = parse_args(std::env::args().skip(1))?;
    let access_token = std::env::var("EZIOGRAM_ACCESS_TOKEN").ok();

    info!("Starting Eziogram relation check ({})", config.environment);
    let state = AppState::new(config, access_token.as_deref())?;

    // 每次运行只解析一次当前用户
    let subject = state
        .auth_service
        .current_subject(access_token.as_deref())
        .await;
    if subject.is_none() {
        warn!("No authenticated subject, toggles are disabled");
    }

    let relation = state
        .relation_service
        .mount_target(args.kind, &args.target_id, args.count, subject.as_ref())
        .await;

    let mut outcome = None;
    if args.toggle {
        if let Some(pending) = relation.toggle_pending() {
            info!("Optimistic state: {:?}", relation.snapshot());
            outcome = Some(pending.confirm().await);
        }
    }

    let snapshot = relation.snapshot();
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "kind": relation.kind(),
            "target_id": relation.target_id(),
            "active": snapshot.active,
            "count": snapshot.count,
            "outcome": outcome,
        }))?
    );

    Ok(())
}
