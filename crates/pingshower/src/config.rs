use clap::builder::Styles;
use clap::{Parser, ValueEnum};
use pingshower_core::defaults;

/// The default value for `log-format`.
pub const DEFAULT_LOG_FORMAT: LogFormat = LogFormat::Compact;

/// The default value for `log-span-events`.
pub const DEFAULT_LOG_SPAN_EVENTS: LogSpanEvents = LogSpanEvents::Off;

/// The default value for `log-filter`.
pub const DEFAULT_LOG_FILTER: &str = "pingshower=info";

/// Continuously ping a host and report round trip time and packet loss
#[derive(Parser, Debug)]
#[command(name = "pingshower", author, version, about, long_about = None, arg_required_else_help(true), styles=Styles::styled())]
pub struct Args {
    /// The hostname or IPv4 address to ping
    pub target: String,

    /// The number of probes in each packet loss window [default: 10]
    #[arg(short = 'i', long, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: Option<u64>,

    /// The debug log format [default: compact]
    #[arg(value_enum, long)]
    pub log_format: Option<LogFormat>,

    /// The debug log filter [default: pingshower=info]
    #[arg(long)]
    pub log_filter: Option<String>,

    /// How to debug log event spans [default: off]
    #[arg(value_enum, long)]
    pub log_span_events: Option<LogSpanEvents>,

    /// Print a summary of all measurements on exit
    #[arg(long)]
    pub summary: bool,
}

/// The debug log format.
#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
pub enum LogFormat {
    /// Display log data in a compact format.
    Compact,
    /// Display log data in a pretty format.
    Pretty,
    /// Display log data in a json format.
    Json,
}

/// How to log event spans.
#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
pub enum LogSpanEvents {
    /// Do not display event spans.
    Off,
    /// Display enter and exit event spans.
    Active,
    /// Display all event spans.
    Full,
}

/// Fully parsed and validated configuration.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PingConfig {
    pub target: String,
    pub interval: u64,
    pub summary: bool,
    pub log_format: LogFormat,
    pub log_filter: String,
    pub log_span_events: LogSpanEvents,
}

impl From<Args> for PingConfig {
    fn from(args: Args) -> Self {
        Self {
            target: args.target,
            interval: args.interval.unwrap_or(defaults::DEFAULT_INTERVAL),
            summary: args.summary,
            log_format: args.log_format.unwrap_or(DEFAULT_LOG_FORMAT),
            log_filter: args
                .log_filter
                .unwrap_or_else(|| String::from(DEFAULT_LOG_FILTER)),
            log_span_events: args.log_span_events.unwrap_or(DEFAULT_LOG_SPAN_EVENTS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_defaults() -> anyhow::Result<()> {
        let expected = PingConfig {
            target: String::from("example.com"),
            interval: 10,
            summary: false,
            log_format: LogFormat::Compact,
            log_filter: String::from("pingshower=info"),
            log_span_events: LogSpanEvents::Off,
        };
        assert_eq!(expected, parse_config("pingshower example.com")?);
        Ok(())
    }

    #[test_case("pingshower example.com -i 5", 5; "short interval")]
    #[test_case("pingshower example.com --interval 20", 20; "long interval")]
    #[test_case("pingshower 1.1.1.1 --interval 1", 1; "minimum interval")]
    fn test_interval(cmd: &str, expected: u64) -> anyhow::Result<()> {
        assert_eq!(expected, parse_config(cmd)?.interval);
        Ok(())
    }

    #[test_case("pingshower example.com --log-format compact", LogFormat::Compact; "compact log format")]
    #[test_case("pingshower example.com --log-format pretty", LogFormat::Pretty; "pretty log format")]
    #[test_case("pingshower example.com --log-format json", LogFormat::Json; "json log format")]
    fn test_log_format(cmd: &str, expected: LogFormat) -> anyhow::Result<()> {
        assert_eq!(expected, parse_config(cmd)?.log_format);
        Ok(())
    }

    #[test_case("pingshower example.com --log-span-events off", LogSpanEvents::Off; "span events off")]
    #[test_case("pingshower example.com --log-span-events active", LogSpanEvents::Active; "span events active")]
    #[test_case("pingshower example.com --log-span-events full", LogSpanEvents::Full; "span events full")]
    fn test_log_span_events(cmd: &str, expected: LogSpanEvents) -> anyhow::Result<()> {
        assert_eq!(expected, parse_config(cmd)?.log_span_events);
        Ok(())
    }

    #[test]
    fn test_log_filter_and_summary() -> anyhow::Result<()> {
        let cfg = parse_config("pingshower example.com --log-filter pingshower_core=trace --summary")?;
        assert_eq!("pingshower_core=trace", cfg.log_filter);
        assert!(cfg.summary);
        Ok(())
    }

    #[test_case("pingshower"; "no target")]
    #[test_case("pingshower a.com b.com"; "two targets")]
    #[test_case("pingshower example.com -i 0"; "zero interval")]
    #[test_case("pingshower example.com -i -1"; "negative interval")]
    #[test_case("pingshower example.com --log-format chrome"; "unknown log format")]
    #[test_case("pingshower example.com --log-span-events some"; "unknown span events")]
    fn test_invalid_args(cmd: &str) {
        assert!(parse_config(cmd).is_err());
    }

    fn parse_config(cmd: &str) -> anyhow::Result<PingConfig> {
        Ok(PingConfig::from(Args::try_parse_from(
            cmd.split(' ').map(std::ffi::OsString::from),
        )?))
    }
}
