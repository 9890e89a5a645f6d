//! Server checks, scheduled calls and call-signal replay

use std::sync::Arc;

use chrono::{DateTime, Duration, Local, Utc};
use clap::ValueEnum;
use colored::Colorize;

use meetai_call_core::{
    AgentId, CallAction, CallActionDispatcher, ExecutionContext, FullScreenIntent, HttpBootstrapClient,
    IncomingCallGateway, IncomingCallScheduler, Navigator, NotificationEvent, Route, SessionBootstrap, SessionRequest,
};

use super::Context;
use crate::gateway::StoredGateway;

/// Alert interaction to simulate
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum EventArg {
    Answer,
    Decline,
    FullScreen,
}

/// Prints where the app would navigate
struct ConsoleNavigator;

impl Navigator for ConsoleNavigator {
    fn navigate(&self, route: Route) {
        println!("{} {}", "→".cyan().bold(), describe_route(&route));
    }
}

fn describe_route(route: &Route) -> String {
    match route {
        Route::Home => "agent list".to_string(),
        Route::IncomingCall(id) => format!("incoming call screen for {}", id),
        Route::RealtimeCall(id) => format!("realtime call with {}", id),
    }
}

fn wire(ctx: &Context) -> (Arc<StoredGateway>, IncomingCallScheduler, Arc<CallActionDispatcher>) {
    let gateway = Arc::new(StoredGateway::new(ctx.backend.clone()));
    let scheduler = IncomingCallScheduler::new(gateway.clone(), ctx.agents.clone())
        .with_channel(ctx.config.notification_channel.clone());
    let dispatcher = Arc::new(CallActionDispatcher::new(
        ctx.agents.clone(),
        ctx.signals.clone(),
        gateway.clone(),
        Arc::new(ConsoleNavigator),
    ));
    dispatcher.install();
    (gateway, scheduler, dispatcher)
}

async fn bootstrap_client(ctx: &Context) -> anyhow::Result<HttpBootstrapClient> {
    let base_url = ctx.settings.base_url().await?;
    Ok(HttpBootstrapClient::new(base_url, &ctx.config)?)
}

/// `meetai ping`
pub async fn ping(ctx: &Context) -> anyhow::Result<()> {
    let client = bootstrap_client(ctx).await?;
    println!("Testing {} ...", client.base_url());
    let message = client.health_check().await?;
    println!("{} {}", "Connected:".green().bold(), message);
    Ok(())
}

/// `meetai session <agent>`: mint credentials the way a call would
pub async fn session(ctx: &Context, agent_id: &str) -> anyhow::Result<()> {
    let agent = ctx.require_agent(agent_id).await?;
    let client = bootstrap_client(ctx).await?;
    let request = SessionRequest::new(agent.params.prompt.clone(), agent.params.name.clone());

    let session = client.create_session(&request).await?;
    println!("{} {}", "Session:".green().bold(), session.id);
    match session.client_secret.expires_at.and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0)) {
        Some(at) => println!("Client secret expires at {}", at.with_timezone(&Local).format("%H:%M:%S")),
        None => println!("Client secret issued"),
    }
    Ok(())
}

/// `meetai schedule <agent>`
pub async fn schedule(
    ctx: &Context,
    agent_id: &str,
    in_minutes: Option<i64>,
    at: Option<DateTime<Utc>>,
) -> anyhow::Result<()> {
    let when = match (at, in_minutes) {
        (Some(at), _) => at,
        (None, Some(minutes)) => Utc::now() + Duration::minutes(minutes),
        (None, None) => anyhow::bail!("pass --in-minutes or --at"),
    };

    let (_, scheduler, _) = wire(ctx);
    let notification_id = scheduler.schedule_for_agent(&AgentId::from(agent_id), when).await?;
    println!(
        "{} {} ({})",
        "Incoming call scheduled for".green(),
        when.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
        notification_id
    );
    Ok(())
}

/// `meetai cancel <agent>`
pub async fn cancel(ctx: &Context, agent_id: &str) -> anyhow::Result<()> {
    let (_, scheduler, _) = wire(ctx);
    if scheduler.cancel_for_agent(&AgentId::from(agent_id)).await? {
        println!("{}", "Scheduled call cancelled".yellow());
    } else {
        println!("No call was scheduled for {}", agent_id);
    }
    Ok(())
}

/// `meetai pending`: alerts waiting to fire
pub async fn pending(ctx: &Context) -> anyhow::Result<()> {
    let gateway = StoredGateway::new(ctx.backend.clone());
    let pending = gateway.pending().await?;
    if pending.is_empty() {
        println!("No pending alerts");
    }
    for notification in pending {
        println!(
            "{}  {}  {}",
            notification.request.trigger_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
            notification.request.title,
            notification.id.to_string().dimmed()
        );
    }
    Ok(())
}

/// `meetai notify <agent> <event>`: act on an alert as the platform would
pub async fn notify(ctx: &Context, agent_id: &str, event: EventArg, foreground: bool) -> anyhow::Result<()> {
    let agent = ctx.require_agent(agent_id).await?;
    let (gateway, _, _dispatcher) = wire(ctx);

    let event = match event {
        EventArg::Answer => NotificationEvent::ActionPressed(CallAction::answer(agent.id.clone())),
        EventArg::Decline => NotificationEvent::ActionPressed(CallAction::decline(agent.id.clone())),
        EventArg::FullScreen => NotificationEvent::FullScreenShown(FullScreenIntent::new(agent.id.clone())),
    };
    let context = if foreground {
        ExecutionContext::Foreground
    } else {
        ExecutionContext::Background
    };

    // the alert has fired, so it is no longer pending
    if let Some(fired) = gateway.pending_for(&agent.id).await? {
        tracing::debug!(notification_id = %fired.id, "alert delivered");
        gateway.cancel(&fired.id).await?;
    }
    let label = match &event {
        NotificationEvent::ActionPressed(action) => action.identifier(),
        NotificationEvent::FullScreenShown(intent) => intent.identifier(),
    };
    gateway.deliver(event, context).await;
    println!("Delivered {} ({:?})", label, context);
    Ok(())
}

/// `meetai resume`: replay what the background handler left behind
pub async fn resume(ctx: &Context) -> anyhow::Result<()> {
    let (_, _, dispatcher) = wire(ctx);
    if dispatcher.resume().await?.is_none() {
        println!("Nothing pending");
    }
    Ok(())
}
