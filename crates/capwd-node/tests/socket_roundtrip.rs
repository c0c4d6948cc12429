//! End-to-end tests over a real unix socket.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};

use capwd::{Broker, ErrorKind, FileSource, Reply, Request, Response, Storage};
use capwd_lattice::{CommandSet, FieldMask, RestrictionState};
use capwd_node::{Client, NodeConfig, NodeError, Server, MAX_FRAME_LEN};

const PASSWD: &str = "\
root:*:0:0:Charlie &:/root:/bin/sh
daemon:*:1:1:Owner of many system processes:/root:/usr/sbin/nologin
operator:*:2:5:System &:/:/usr/sbin/nologin
";

struct Harness {
    _dir: tempfile::TempDir,
    socket: PathBuf,
    broker: Arc<Broker>,
    server: Server,
}

impl Harness {
    async fn start(initial: RestrictionState) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let passwd = dir.path().join("passwd");
        std::fs::write(&passwd, PASSWD).unwrap();

        let broker = Arc::new(Broker::with_source(FileSource::open(&passwd).unwrap()));
        let socket = dir.path().join("capwd.sock");
        let listener = UnixListener::bind(&socket).unwrap();
        let server = Server::start(listener, Arc::clone(&broker), initial);

        Self {
            _dir: dir,
            socket,
            broker,
            server,
        }
    }

    async fn client(&self) -> Client {
        Client::connect(&self.socket).await.unwrap()
    }

    async fn wait_for_channels(&self, expected: usize) {
        for _ in 0..100 {
            if self.broker.channel_count() == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(self.broker.channel_count(), expected);
    }
}

fn get_nam(name: &str) -> Request {
    Request::GetNam {
        name: name.to_string(),
        storage: Storage::Owned,
    }
}

#[tokio::test]
async fn test_lookup_through_socket() {
    let harness = Harness::start(RestrictionState::default()).await;
    let mut client = harness.client().await;
    let root = client.root();

    match client.call(root, get_nam("operator")).await.unwrap() {
        Reply::Record(record) => {
            assert_eq!(record.uid(), 2);
            assert_eq!(record.gecos(), "System &");
        }
        other => panic!("unexpected reply {:?}", other),
    }
    assert_eq!(
        client.call(root, get_nam("nobody")).await.unwrap(),
        Reply::NotFound
    );

    harness.server.shutdown().await;
}

#[tokio::test]
async fn test_clone_narrow_and_delegate() {
    let harness = Harness::start(RestrictionState::default()).await;
    let mut client = harness.client().await;
    let root = client.root();

    let child = match client.call(root, Request::Clone).await.unwrap() {
        Reply::Cloned(id) => id,
        other => panic!("unexpected reply {:?}", other),
    };
    client
        .call(
            child,
            Request::LimitFields {
                fields: vec!["pw_name".into()],
            },
        )
        .await
        .unwrap();
    client
        .call(
            child,
            Request::LimitUsers {
                names: vec!["daemon".into()],
                uids: vec![],
            },
        )
        .await
        .unwrap();

    let err = client
        .call(
            child,
            Request::LimitFields {
                fields: vec!["pw_name".into(), "pw_dir".into()],
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.remote_kind(), Some(ErrorKind::CapabilityDenied));

    assert_eq!(
        client.call(child, get_nam("root")).await.unwrap(),
        Reply::NotFound
    );
    match client
        .call(child, Request::GetUid { uid: 1, storage: Storage::Owned })
        .await
        .unwrap()
    {
        Reply::Record(record) => {
            assert_eq!(record.name(), "daemon");
            assert_eq!(record.fields(), FieldMask::empty().with(capwd_lattice::Field::Name));
        }
        other => panic!("unexpected reply {:?}", other),
    }

    // the root channel is untouched
    match client.call(root, Request::Limits).await.unwrap() {
        Reply::Limits(state) => assert_eq!(state, RestrictionState::default()),
        other => panic!("unexpected reply {:?}", other),
    }

    harness.server.shutdown().await;
}

#[tokio::test]
async fn test_channels_are_private_to_a_connection() {
    let harness = Harness::start(RestrictionState::default()).await;
    let mut first = harness.client().await;
    let mut second = harness.client().await;

    let err = second
        .call(first.root(), Request::Limits)
        .await
        .unwrap_err();
    assert_eq!(err.remote_kind(), Some(ErrorKind::ChannelClosed));

    // the first connection's channel is still fine
    let root = first.root();
    assert_eq!(first.call(root, Request::SetEnt).await.unwrap(), Reply::Rewound);

    harness.server.shutdown().await;
}

#[tokio::test]
async fn test_disconnect_closes_owned_channels() {
    let harness = Harness::start(RestrictionState::default()).await;
    let mut client = harness.client().await;
    let root = client.root();
    client.call(root, Request::Clone).await.unwrap();
    client.call(root, Request::Clone).await.unwrap();
    harness.wait_for_channels(3).await;

    drop(client);
    harness.wait_for_channels(0).await;

    harness.server.shutdown().await;
}

#[tokio::test]
async fn test_config_limits_are_the_baseline() {
    let config = NodeConfig::parse("[limits]\ncommands = [\"getpwnam\"]\n").unwrap();
    let harness = Harness::start(config.initial_state().unwrap()).await;
    let mut client = harness.client().await;
    let root = client.root();

    let err = client.call(root, Request::SetEnt).await.unwrap_err();
    assert_eq!(err.remote_kind(), Some(ErrorKind::CapabilityDenied));

    let err = client
        .call(
            root,
            Request::LimitCommands {
                commands: CommandSet::all()
                    .names()
                    .into_iter()
                    .map(String::from)
                    .collect(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, NodeError::Remote { .. }));
    assert!(client.call(root, get_nam("root")).await.is_ok());

    harness.server.shutdown().await;
}

#[tokio::test]
async fn test_malformed_frame_is_answered() {
    let harness = Harness::start(RestrictionState::default()).await;
    let mut client = harness.client().await;

    match client.exchange(br#"{"channel":1,"request":{"op":"getpwall"}}"#).await.unwrap() {
        Response::Error(frame) => assert_eq!(frame.kind, ErrorKind::MalformedRequest),
        other => panic!("unexpected response {:?}", other),
    }
    let root = client.root();
    assert_eq!(client.call(root, Request::SetEnt).await.unwrap(), Reply::Rewound);

    harness.server.shutdown().await;
}

#[tokio::test]
async fn test_oversized_frame_ends_connection() {
    let harness = Harness::start(RestrictionState::default()).await;
    let stream = UnixStream::connect(&harness.socket).await.unwrap();
    let (read, mut write) = stream.into_split();
    let mut reader = BufReader::new(read);

    let mut hello = String::new();
    reader.read_line(&mut hello).await.unwrap();
    assert!(hello.starts_with(r#"{"hello":"#));

    // one byte over the limit and no newline yet
    let frame = vec![b'x'; MAX_FRAME_LEN + 1];
    write.write_all(&frame).await.unwrap();

    let mut line = String::new();
    reader.read_line(&mut line).await.unwrap();
    match serde_json::from_str::<Response>(&line).unwrap() {
        Response::Error(frame) => assert_eq!(frame.kind, ErrorKind::MalformedRequest),
        other => panic!("unexpected response {:?}", other),
    }

    line.clear();
    assert_eq!(reader.read_line(&mut line).await.unwrap(), 0);
    harness.wait_for_channels(0).await;

    harness.server.shutdown().await;
}
