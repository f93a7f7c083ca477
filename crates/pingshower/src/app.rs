use crate::config::{LogFormat, LogSpanEvents, PingConfig};
use crate::report::console::Console;
use crate::report::summary::{Recorder, Summary};
use anyhow::{anyhow, Context};
use crossbeam::channel::{self, Receiver, Sender};
use pingshower_core::resolve::resolve_ipv4;
use pingshower_core::{default_identifier, Builder, Observer, PingClient};
use pingshower_privilege::Privilege;
use std::sync::Arc;
use tracing_subscriber::fmt::format::FmtSpan;

/// Run the ping client until interrupted or until it fails.
pub fn run_pingshower(cfg: &PingConfig) -> anyhow::Result<()> {
    configure_logging(cfg);
    let privilege = Privilege::acquire_privileges()?;
    if !privilege.has_privileges() {
        return Err(anyhow!(
            "privileges are required to open a raw ICMP socket\n\n\
            see https://github.com/pingshower/pingshower#privileges for details"
        ));
    }
    let client = make_client(cfg)?;
    tracing::debug!(addr = %client.target_addr(), identifier = ?client.identifier(), "client built");
    let (observers, recorder, stopped_rx) = make_observers(cfg.summary);
    for observer in observers {
        client.add_observer(observer);
    }
    client.start()?;
    Privilege::drop_privileges()?;
    let (signal_tx, signal_rx) = channel::bounded(1);
    ctrlc::set_handler(move || {
        let _ = signal_tx.try_send(());
    })?;
    crossbeam::select! {
        recv(signal_rx) -> _ => tracing::debug!("termination signal received"),
        recv(stopped_rx) -> _ => tracing::debug!("ping client stopped"),
    }
    let result = client.stop();
    if let Some(recorder) = recorder {
        print!("{}", Summary::new(&cfg.target, &recorder.snapshot()));
    }
    result.with_context(|| format!("pinging {} failed", cfg.target))
}

/// Resolve the target and build the client.
fn make_client(cfg: &PingConfig) -> anyhow::Result<PingClient> {
    let target_addr = resolve_ipv4(&cfg.target)
        .with_context(|| format!("failed to resolve {}", cfg.target))?;
    Ok(Builder::new(target_addr)
        .trace_identifier(default_identifier())
        .interval(cfg.interval)
        .build()?)
}

/// The observers to register, in registration order.
///
/// The stop signal comes last so every other observer has seen `on_stop`
/// before the main thread is woken.
fn make_observers(
    summary: bool,
) -> (Vec<Arc<dyn Observer>>, Option<Arc<Recorder>>, Receiver<()>) {
    let mut observers: Vec<Arc<dyn Observer>> = vec![Arc::new(Console)];
    let recorder = summary.then(|| Arc::new(Recorder::default()));
    if let Some(recorder) = &recorder {
        observers.push(Arc::clone(recorder) as Arc<dyn Observer>);
    }
    let (stopped_tx, stopped_rx) = channel::bounded(1);
    observers.push(Arc::new(StopSignal(stopped_tx)));
    (observers, recorder, stopped_rx)
}

/// Wake the main thread when the client stops on its own.
struct StopSignal(Sender<()>);

impl Observer for StopSignal {
    fn on_rtt_update(&self, _timeout: bool, _sequence: u64, _rtt_ms: u64) {}

    fn on_packet_loss_update(&self, _sequence: u64, _loss: f64) {}

    fn on_stop(&self) {
        let _ = self.0.try_send(());
    }
}

fn configure_logging(cfg: &PingConfig) {
    let fmt_span = match cfg.log_span_events {
        LogSpanEvents::Off => FmtSpan::NONE,
        LogSpanEvents::Active => FmtSpan::ACTIVE,
        LogSpanEvents::Full => FmtSpan::FULL,
    };
    match cfg.log_format {
        LogFormat::Compact => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_span_events(fmt_span)
                .with_env_filter(&cfg.log_filter)
                .compact()
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_span_events(fmt_span)
                .with_env_filter(&cfg.log_filter)
                .pretty()
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_span_events(fmt_span)
                .with_env_filter(&cfg.log_filter)
                .json()
                .init();
        }
    }
}
