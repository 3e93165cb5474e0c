use std::time::{Duration, Instant};

use async_std::channel::{self, Receiver};
use async_std::{future, task};

/// Holds the latest value until it has been left alone for `delay`.
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Debouncer {
            delay,
            pending: None,
        }
    }

    /// Replaces any pending value and restarts the delay from `now`.
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now + self.delay));
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }

    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match self.pending {
            Some((_, deadline)) if now >= deadline => self.pending.take().map(|(value, _)| value),
            _ => None,
        }
    }
}

/// Forwards values from `input` once they stayed unchanged for `delay`.
///
/// A settled value equal to the previously forwarded one is not sent again.
/// The task ends when either side of the channel is closed; a value still
/// waiting out its delay at that point is dropped.
pub fn debounce<T>(input: Receiver<T>, delay: Duration) -> Receiver<T>
where
    T: Clone + PartialEq + Send + 'static,
{
    let (tx, rx) = channel::unbounded();

    task::spawn(async move {
        let mut debouncer = Debouncer::new(delay);
        let mut last_sent: Option<T> = None;

        loop {
            let received = match debouncer.deadline() {
                Some(deadline) => {
                    let wait = deadline.saturating_duration_since(Instant::now());
                    future::timeout(wait, input.recv()).await.ok()
                },
                None => Some(input.recv().await),
            };

            match received {
                Some(Ok(value)) => debouncer.push(value, Instant::now()),
                Some(Err(_)) => break,
                None => {},
            }

            if let Some(value) = debouncer.poll(Instant::now()) {
                if last_sent.as_ref() == Some(&value) {
                    continue;
                }
                last_sent = Some(value.clone());
                if tx.send(value).await.is_err() {
                    break;
                }
            }
        }
    });

    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(400);

    #[test]
    fn waits_for_delay() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(DELAY);
        debouncer.push("c", start);

        assert_eq!(debouncer.poll(start + Duration::from_millis(399)), None);
        assert_eq!(debouncer.poll(start + DELAY), Some("c"));
        assert_eq!(debouncer.poll(start + DELAY * 2), None);
    }

    #[test]
    fn push_restarts_delay() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(DELAY);
        debouncer.push("c", start);
        debouncer.push("ca", start + Duration::from_millis(300));
        debouncer.push("cat", start + Duration::from_millis(600));

        assert_eq!(debouncer.deadline(), Some(start + Duration::from_millis(1000)));
        assert_eq!(debouncer.poll(start + Duration::from_millis(900)), None);
        assert_eq!(debouncer.poll(start + Duration::from_millis(1000)), Some("cat"));
    }

    #[test]
    fn nothing_pending() {
        let mut debouncer: Debouncer<String> = Debouncer::new(DELAY);
        assert_eq!(debouncer.deadline(), None);
        assert_eq!(debouncer.poll(Instant::now()), None);
    }

    #[async_std::test]
    async fn forwards_only_last_value_of_burst() {
        let (tx, rx) = channel::unbounded();
        let settled = debounce(rx, Duration::from_millis(50));

        for term in &["c", "ca", "cat", "cats"] {
            tx.send(term.to_string()).await.unwrap();
        }

        assert_eq!(settled.recv().await.unwrap(), "cats");
        assert!(future::timeout(Duration::from_millis(200), settled.recv())
            .await
            .is_err());
    }

    #[async_std::test]
    async fn identical_settled_value_is_not_repeated() {
        let (tx, rx) = channel::unbounded();
        let settled = debounce(rx, Duration::from_millis(30));

        tx.send("cats".to_string()).await.unwrap();
        assert_eq!(settled.recv().await.unwrap(), "cats");

        tx.send("cats".to_string()).await.unwrap();
        tx.send("dogs".to_string()).await.unwrap();
        assert_eq!(settled.recv().await.unwrap(), "dogs");
    }

    #[async_std::test]
    async fn closes_with_input() {
        let (tx, rx) = channel::unbounded::<String>();
        let settled = debounce(rx, Duration::from_millis(30));
        drop(tx);

        assert!(settled.recv().await.is_err());
    }
}
