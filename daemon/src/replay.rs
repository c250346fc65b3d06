//! Drives a [`Script`] against a live [`VerificationService`].
//!
//! Each scripted step runs on its own task after its delay, so responses
//! reach the service concurrently and out of order, as they would from real
//! verifier agents. A ticker expires overdue sessions.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use verigate_installer::{InstallerError, SessionSummary, VerificationEvent, VerificationService};
use verigate_types::{SessionId, Timestamp, VerifierId};

use crate::script::{Action, Script};

pub struct ReplayOptions {
    pub tick: Duration,
    pub print_events: bool,
}

pub async fn run(
    service: Arc<VerificationService>,
    script: Script,
    options: ReplayOptions,
) -> anyhow::Result<Vec<SessionSummary>> {
    let mut tasks: JoinSet<Result<(), InstallerError>> = JoinSet::new();
    let mut session_ids = Vec::with_capacity(script.sessions.len());

    for session in script.sessions {
        let verifiers: Vec<_> = session.verifiers.iter().map(|v| (v.id, v.role)).collect();
        service.start_session(session.id, &verifiers, Timestamp::now()).await?;
        if let Some(code) = session.integrity {
            service.set_integrity_result(session.id, code).await?;
        }
        session_ids.push(session.id);

        for step in session.steps {
            let action = step.action()?;
            let svc = Arc::clone(&service);
            let id = session.id;
            let delay = Duration::from_millis(step.after_ms);
            tasks.spawn(async move {
                tokio::time::sleep(delay).await;
                perform(&svc, id, step.verifier, action).await
            });
        }
    }

    let mut ticker = tokio::time::interval(options.tick);
    loop {
        tokio::select! {
            Some(joined) = tasks.join_next() => {
                joined??;
            }
            _ = ticker.tick() => {
                service.expire(Timestamp::now()).await;
                report(service.drain_events().await, options.print_events)?;
                if tasks.is_empty() && service.next_deadline().await.is_none() {
                    break;
                }
            }
        }
    }

    let mut summaries = Vec::with_capacity(session_ids.len());
    for id in session_ids {
        summaries.push(service.finish_session(id).await?);
    }
    Ok(summaries)
}

async fn perform(
    service: &VerificationService,
    session: SessionId,
    verifier: VerifierId,
    action: Action,
) -> Result<(), InstallerError> {
    match action {
        Action::Respond(code) => {
            service.record_response(session, verifier, code).await?;
        }
        Action::Extend(ms) => {
            service
                .extend_timeout(session, verifier, ms, Timestamp::now())
                .await?;
        }
    }
    Ok(())
}

fn report(events: Vec<VerificationEvent>, print: bool) -> anyhow::Result<()> {
    for event in events {
        tracing::debug!(session = %event.session(), ?event, "verification event");
        if print {
            println!("{}", serde_json::to_string(&event)?);
        }
    }
    Ok(())
}
