//! Background backend polling.
//!
//! One thread with its own current-thread tokio runtime. Both the fetch and
//! the wait between polls race the command channel, so a refresh request or
//! shutdown wakes it immediately, even mid-request.

use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use estufa_core::{EstufaClient, FetchOutcome};

/// Latest published snapshot.
#[derive(Debug, Default)]
pub struct SharedState {
    pub outcome: Option<FetchOutcome>,
    pub fetching: bool,
    /// Incremented on every publish.
    pub cycle: u64,
    pub updated_at: Option<DateTime<Utc>>,
}

impl SharedState {
    pub fn publish(&mut self, outcome: FetchOutcome, at: DateTime<Utc>) {
        self.outcome = Some(outcome);
        self.fetching = false;
        self.cycle += 1;
        self.updated_at = Some(at);
    }
}

/// Lock the shared state, recovering it if a holder panicked.
pub fn lock(shared: &Mutex<SharedState>) -> MutexGuard<'_, SharedState> {
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

enum Command {
    Refresh,
    Stop,
}

pub struct Poller {
    commands: UnboundedSender<Command>,
    handle: Option<JoinHandle<()>>,
}

impl Poller {
    pub fn spawn(
        client: EstufaClient,
        interval: Duration,
        shared: Arc<Mutex<SharedState>>,
    ) -> io::Result<Self> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let (tx, rx) = mpsc::unbounded_channel();

        let handle = thread::Builder::new()
            .name("estufa-poller".into())
            .spawn(move || {
                rt.block_on(poll_loop(client, interval, shared, rx));
                // Abandon in-flight resolver work instead of waiting on it.
                rt.shutdown_background();
                log::debug!("poller stopped");
            })?;

        Ok(Self {
            commands: tx,
            handle: Some(handle),
        })
    }

    /// Fetch now instead of at the end of the interval.
    pub fn refresh(&self) {
        let _ = self.commands.send(Command::Refresh);
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Stop);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

async fn poll_loop(
    client: EstufaClient,
    interval: Duration,
    shared: Arc<Mutex<SharedState>>,
    mut commands: UnboundedReceiver<Command>,
) {
    loop {
        lock(&shared).fetching = true;
        let fetch = client.fetch_entities();
        tokio::pin!(fetch);
        let outcome = loop {
            let command = tokio::select! {
                outcome = &mut fetch => break outcome,
                command = commands.recv() => command,
            };
            // A refresh while fetching is already satisfied.
            if !matches!(command, Some(Command::Refresh)) {
                return;
            }
        };
        log::debug!(
            "fetched {} estufas ({})",
            outcome.entities.len(),
            outcome.source
        );
        lock(&shared).publish(outcome, Utc::now());

        match tokio::time::timeout(interval, commands.recv()).await {
            Ok(Some(Command::Refresh)) | Err(_) => continue,
            Ok(Some(Command::Stop)) | Ok(None) => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use estufa_core::{DataSource, SyntheticGenerator};
    use std::time::Instant;

    fn wait_for_cycle(shared: &Mutex<SharedState>, cycle: u64) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while lock(shared).cycle < cycle {
            assert!(Instant::now() < deadline, "poller did not publish");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn publishes_and_refreshes_on_demand() {
        let shared = Arc::new(Mutex::new(SharedState::default()));
        let client = EstufaClient::offline().with_generator(SyntheticGenerator::seeded(1));
        let poller = Poller::spawn(client, Duration::from_secs(3600), Arc::clone(&shared)).unwrap();

        wait_for_cycle(&shared, 1);
        {
            let s = lock(&shared);
            assert_eq!(s.outcome.as_ref().unwrap().source, DataSource::Synthetic);
            assert!(!s.fetching);
        }

        poller.refresh();
        wait_for_cycle(&shared, 2);
    }

    #[test]
    fn drop_cancels_a_hanging_fetch() {
        // Accepts connections at the kernel level but never answers.
        let silent = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", silent.local_addr().unwrap());
        let client = EstufaClient::new(url, Duration::from_secs(10));
        let shared = Arc::new(Mutex::new(SharedState::default()));
        let poller = Poller::spawn(client, Duration::from_secs(3600), Arc::clone(&shared)).unwrap();

        thread::sleep(Duration::from_millis(200));
        assert!(lock(&shared).fetching);

        let start = Instant::now();
        drop(poller);
        assert!(start.elapsed() < Duration::from_secs(2));
        assert_eq!(lock(&shared).cycle, 0);
    }

    #[test]
    fn drop_stops_promptly_despite_long_interval() {
        let shared = Arc::new(Mutex::new(SharedState::default()));
        let poller = Poller::spawn(
            EstufaClient::offline(),
            Duration::from_secs(3600),
            Arc::clone(&shared),
        )
        .unwrap();
        wait_for_cycle(&shared, 1);

        let start = Instant::now();
        drop(poller);
        assert!(start.elapsed() < Duration::from_secs(2));
        let cycle = lock(&shared).cycle;
        thread::sleep(Duration::from_millis(20));
        assert_eq!(lock(&shared).cycle, cycle);
    }
}
