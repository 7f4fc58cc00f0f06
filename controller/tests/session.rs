// session.rs - controller sessions against an in-process engine

use std::net::SocketAddr;
use std::time::Duration;

use gol_controller::session::{self, SessionConfig};
use gol_controller::{Event, Seed, SessionError, State};
use gol_engine::{ClientError, Engine, EngineConfig, RunParameters, server};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

async fn spawn_engine() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server::serve(listener, Engine::new(EngineConfig::default()), std::future::pending()));
    addr
}

fn config(addr: SocketAddr, turns: u64, size: usize, seed: Seed) -> SessionConfig {
    SessionConfig {
        server: addr.to_string(),
        params: RunParameters {
            turns,
            threads: 2,
            image_width: size,
            image_height: size,
        },
        seed,
        poll_interval: Duration::from_millis(5),
    }
}

struct Running {
    events: mpsc::UnboundedReceiver<Event>,
    keys: mpsc::Sender<char>,
    task: JoinHandle<Result<(), SessionError>>,
}

fn launch(config: SessionConfig) -> Running {
    let (events_tx, events) = mpsc::unbounded_channel();
    let (keys, keys_rx) = mpsc::channel(8);
    let task = tokio::spawn(session::run(config, events_tx, keys_rx));
    Running { events, keys, task }
}

impl Running {
    async fn next_matching(&mut self, wanted: impl Fn(&Event) -> bool) -> Event {
        tokio::time::timeout(Duration::from_secs(20), async {
            loop {
                let event = self.events.recv().await.expect("session ended early");
                if wanted(&event) {
                    return event;
                }
            }
        })
        .await
        .expect("timed out waiting for event")
    }

    async fn finish(self) -> Vec<Event> {
        let Running { mut events, keys, task } = self;
        let result = tokio::time::timeout(Duration::from_secs(20), task).await.unwrap().unwrap();
        drop(keys);
        result.unwrap();
        let mut rest = Vec::new();
        while let Some(event) = events.recv().await {
            rest.push(event);
        }
        rest
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn run_to_completion_reports_final_turn() {
    let addr = spawn_engine().await;
    let running = launch(config(addr, 50, 16, Seed::Pattern("block".into())));

    let events = running.finish().await;
    let tail = &events[events.len() - 3..];

    let Event::FinalTurnComplete { completed_turns, alive } = &tail[0] else {
        panic!("expected FinalTurnComplete, got {:?}", tail[0]);
    };
    assert_eq!(*completed_turns, 50);
    assert_eq!(alive.len(), 4);

    let Event::ImageOutputComplete { filename, world, .. } = &tail[1] else {
        panic!("expected ImageOutputComplete, got {:?}", tail[1]);
    };
    assert_eq!(filename, "16x16x50");
    assert_eq!(world.alive_count(), 4);

    assert_eq!(
        tail[2],
        Event::StateChange { completed_turns: 50, new_state: State::Quitting }
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn keys_pause_save_resume_and_quit() {
    let addr = spawn_engine().await;
    let mut running = launch(config(addr, 1_000_000, 16, Seed::Random(8)));

    running
        .next_matching(|e| matches!(e, Event::AliveCellsCount { completed_turns, .. } if *completed_turns > 0))
        .await;

    running.keys.send('p').await.unwrap();
    let paused = running
        .next_matching(|e| matches!(e, Event::StateChange { new_state: State::Paused, .. }))
        .await;

    running.keys.send('s').await.unwrap();
    let saved = running
        .next_matching(|e| matches!(e, Event::ImageOutputComplete { .. }))
        .await;
    assert_eq!(saved.completed_turns(), paused.completed_turns());
    let Event::ImageOutputComplete { filename, .. } = &saved else { unreachable!() };
    assert_eq!(filename, &format!("16x16x{}", paused.completed_turns()));

    running.keys.send('p').await.unwrap();
    let resumed = running
        .next_matching(|e| matches!(e, Event::StateChange { new_state: State::Executing, .. }))
        .await;
    assert_eq!(resumed.completed_turns(), paused.completed_turns());

    running.keys.send('q').await.unwrap();
    let quit = running
        .next_matching(|e| matches!(e, Event::StateChange { new_state: State::Quitting, .. }))
        .await;
    assert!(quit.completed_turns() >= paused.completed_turns());
    running.finish().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn two_controllers_share_one_run() {
    let addr = spawn_engine().await;
    let first = launch(config(addr, 2_000, 24, Seed::Random(21)));
    let second = launch(config(addr, 2_000, 24, Seed::Random(21)));

    let final_of = |events: Vec<Event>| {
        events
            .into_iter()
            .find_map(|e| match e {
                Event::FinalTurnComplete { alive, .. } => Some(alive),
                _ => None,
            })
            .expect("no final turn")
    };

    let (a, b) = tokio::join!(first.finish(), second.finish());
    assert_eq!(final_of(a), final_of(b));
}

#[tokio::test]
async fn unreachable_engine_is_a_connect_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (events_tx, _events) = mpsc::unbounded_channel();
    let (_keys, keys_rx) = mpsc::channel(1);
    let err = session::run(config(addr, 1, 4, Seed::Random(1)), events_tx, keys_rx)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Client(ClientError::Connect { .. })), "{err}");
}
