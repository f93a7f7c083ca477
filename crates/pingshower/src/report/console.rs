use pingshower_core::Observer;

/// Print every measurement to stdout as it arrives.
#[derive(Debug, Default)]
pub struct Console;

impl Observer for Console {
    fn on_rtt_update(&self, timeout: bool, sequence: u64, rtt_ms: u64) {
        println!("{}", format_rtt(timeout, sequence, rtt_ms));
    }

    fn on_packet_loss_update(&self, sequence: u64, loss: f64) {
        println!("{}", format_loss(sequence, loss));
    }
}

fn format_rtt(timeout: bool, sequence: u64, rtt_ms: u64) -> String {
    if timeout {
        format!("seq={sequence} timeout")
    } else {
        format!("seq={sequence} rtt={rtt_ms}ms")
    }
}

fn format_loss(sequence: u64, loss: f64) -> String {
    format!("seq={sequence} loss={:.1}%", loss * 100_f64)
}
