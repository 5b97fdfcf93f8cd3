//! The paced transmission loop
//!
//! One message per interval against any writable sink, until the stop flag
//! is raised. In production the sink is the configured serial connection;
//! tests drive the same loop against in-memory and file-backed sinks.

use crate::transmit::{message, TransmitConfig, WritePolicy};
use log::debug;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Statistics for a finished run
#[derive(Debug, Clone, Copy)]
pub struct TransmitStats {
    /// Messages written (one single-attempt write per message)
    pub sent: u64,
    /// Wall time spent in the loop
    pub elapsed: Duration,
}

impl TransmitStats {
    /// Measured message rate over the run. Sleep-based pacing puts this
    /// below the nominal rate: every iteration adds formatting and write
    /// overhead on top of the configured interval.
    pub fn achieved_rate_hz(&self) -> f64 {
        if self.elapsed.is_zero() {
            return 0.0;
        }
        self.sent as f64 / self.elapsed.as_secs_f64()
    }
}

/// Periodic transmitter: an incrementing counter, one message per interval
///
/// The counter starts at 0, advances by one per message whether or not the
/// write succeeded, and wraps only on u64 overflow. It is never reset during
/// a run.
pub struct Transmitter {
    config: TransmitConfig,
    counter: u64,
}

impl Transmitter {
    pub fn new(config: TransmitConfig) -> Self {
        Self { config, counter: 0 }
    }

    /// Value the next message will carry
    pub fn next_value(&self) -> u64 {
        self.counter
    }

    /// Run the paced loop against `sink` until `stop` is raised.
    ///
    /// The flag is checked once per iteration, before the write, so a flag
    /// raised ahead of the call produces zero writes. Each message gets a
    /// single write attempt with no partial-write retry; the outcome is
    /// discarded under `WritePolicy::BestEffort` and fatal under
    /// `WritePolicy::Strict`.
    pub fn run<W: Write>(&mut self, sink: &mut W, stop: &AtomicBool) -> io::Result<TransmitStats> {
        let mut buf = String::new();
        let mut sent = 0u64;
        let started = Instant::now();

        while !stop.load(Ordering::SeqCst) {
            message::render(&mut buf, self.counter);
            let outcome = sink.write(buf.as_bytes());
            sent += 1;
            self.counter = self.counter.wrapping_add(1);

            if self.config.policy == WritePolicy::Strict {
                match outcome {
                    Ok(n) if n < buf.len() => {
                        return Err(io::Error::new(
                            io::ErrorKind::WriteZero,
                            format!("short write: {} of {} bytes", n, buf.len()),
                        ));
                    }
                    Ok(_) => {}
                    Err(e) => return Err(e),
                }
            }

            thread::sleep(self.config.interval);
        }

        let stats = TransmitStats {
            sent,
            elapsed: started.elapsed(),
        };
        debug!(
            "transmission stopped after {} messages in {:?}",
            stats.sent, stats.elapsed
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Seek, SeekFrom};
    use std::sync::Arc;

    fn fast_config() -> TransmitConfig {
        TransmitConfig::default().with_interval(Duration::from_micros(10))
    }

    /// Sink that records every write and raises the stop flag once it has
    /// seen `limit` messages.
    struct LimitedSink {
        data: Vec<u8>,
        messages: usize,
        limit: usize,
        stop: Arc<AtomicBool>,
    }

    impl LimitedSink {
        fn new(limit: usize, stop: &Arc<AtomicBool>) -> Self {
            Self {
                data: Vec::new(),
                messages: 0,
                limit,
                stop: Arc::clone(stop),
            }
        }
    }

    impl Write for LimitedSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.data.extend_from_slice(buf);
            self.messages += 1;
            if self.messages >= self.limit {
                self.stop.store(true, Ordering::SeqCst);
            }
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Sink that fails every write, raising the stop flag after `limit`
    /// attempts so best-effort runs still terminate.
    struct FailingSink {
        attempts: usize,
        limit: usize,
        stop: Arc<AtomicBool>,
    }

    impl Write for FailingSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            self.attempts += 1;
            if self.attempts >= self.limit {
                self.stop.store(true, Ordering::SeqCst);
            }
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "device gone"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_first_messages_count_up_from_zero() {
        let stop = Arc::new(AtomicBool::new(false));
        let mut sink = LimitedSink::new(3, &stop);
        let mut tx = Transmitter::new(fast_config());

        let stats = tx.run(&mut sink, &stop).unwrap();

        assert_eq!(sink.data, b"0\n1\n2\n");
        assert_eq!(stats.sent, 3);
        assert_eq!(tx.next_value(), 3);
    }

    #[test]
    fn test_messages_stay_monotonic_across_digit_widths() {
        let stop = Arc::new(AtomicBool::new(false));
        let mut sink = LimitedSink::new(12, &stop);
        let mut tx = Transmitter::new(fast_config());

        tx.run(&mut sink, &stop).unwrap();

        let text = String::from_utf8(sink.data).unwrap();
        let values: Vec<u64> = text.lines().map(|l| l.parse().unwrap()).collect();
        assert_eq!(values.len(), 12);
        assert_eq!(values[0], 0);
        for pair in values.windows(2) {
            assert_eq!(pair[1], pair[0] + 1);
        }
    }

    #[test]
    fn test_pre_raised_stop_flag_writes_nothing() {
        let stop = Arc::new(AtomicBool::new(true));
        let mut sink = LimitedSink::new(1, &stop);
        let mut tx = Transmitter::new(fast_config());

        let stats = tx.run(&mut sink, &stop).unwrap();

        assert_eq!(stats.sent, 0);
        assert!(sink.data.is_empty());
        assert_eq!(tx.next_value(), 0);
    }

    #[test]
    fn test_strict_policy_aborts_on_write_error() {
        let stop = Arc::new(AtomicBool::new(false));
        let mut sink = FailingSink {
            attempts: 0,
            limit: usize::MAX,
            stop: Arc::clone(&stop),
        };
        let mut tx = Transmitter::new(fast_config().with_policy(WritePolicy::Strict));

        let err = tx.run(&mut sink, &stop).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(sink.attempts, 1);
    }

    #[test]
    fn test_strict_policy_aborts_on_short_write() {
        struct ShortSink;
        impl Write for ShortSink {
            fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
                Ok(1)
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let stop = AtomicBool::new(false);
        let mut tx = Transmitter::new(fast_config().with_policy(WritePolicy::Strict));

        let err = tx.run(&mut ShortSink, &stop).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WriteZero);
    }

    #[test]
    fn test_best_effort_ignores_write_errors() {
        let stop = Arc::new(AtomicBool::new(false));
        let mut sink = FailingSink {
            attempts: 0,
            limit: 5,
            stop: Arc::clone(&stop),
        };
        let mut tx = Transmitter::new(fast_config());

        let stats = tx.run(&mut sink, &stop).unwrap();

        assert_eq!(stats.sent, 5);
        assert_eq!(sink.attempts, 5);
        // The counter advances whether or not the write landed.
        assert_eq!(tx.next_value(), 5);
    }

    #[test]
    fn test_file_backed_run_produces_incrementing_lines() {
        let stop = Arc::new(AtomicBool::new(false));
        let mut file = tempfile::tempfile().unwrap();

        let flag = Arc::clone(&stop);
        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            flag.store(true, Ordering::SeqCst);
        });

        let mut tx = Transmitter::new(fast_config());
        let stats = tx.run(&mut file, &stop).unwrap();
        stopper.join().unwrap();

        assert!(stats.sent > 0);

        let mut text = String::new();
        file.seek(SeekFrom::Start(0)).unwrap();
        file.read_to_string(&mut text).unwrap();

        let values: Vec<u64> = text.lines().map(|l| l.parse().unwrap()).collect();
        assert_eq!(values.len() as u64, stats.sent);
        assert_eq!(values[0], 0);
        for pair in values.windows(2) {
            assert_eq!(pair[1], pair[0] + 1);
        }
    }

    #[test]
    fn test_achieved_rate() {
        let stats = TransmitStats {
            sent: 100,
            elapsed: Duration::from_secs(1),
        };
        assert_eq!(stats.achieved_rate_hz(), 100.0);

        let empty = TransmitStats {
            sent: 0,
            elapsed: Duration::ZERO,
        };
        assert_eq!(empty.achieved_rate_hz(), 0.0);
    }
}
