//! Bot session integration tests
//! Run with: cargo test --test bot_session

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rtm_bot::infrastructure::adapters::memory::{self, MemoryPeer};
use rtm_bot::{Bot, BotError, CommandError, Conversation, KeepaliveSettings, Message};

/// Keeps heartbeats out of the way of content assertions
fn quiet_keepalive() -> KeepaliveSettings {
    KeepaliveSettings {
        initial_delay: Duration::from_secs(3600),
        ..KeepaliveSettings::default()
    }
}

fn bot() -> (Bot, MemoryPeer) {
    let (transport, peer) = memory::channel();
    (Bot::new("UBOT", transport).with_keepalive(quiet_keepalive()), peer)
}

async fn next_reply(peer: &mut MemoryPeer) -> Message {
    tokio::time::timeout(Duration::from_secs(5), peer.next_outbound())
        .await
        .expect("reply within 5s")
        .expect("connection still open")
}

#[tokio::test]
async fn test_only_relevant_messages_reach_handlers() {
    let (mut bot, mut peer) = bot();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    bot.register_command("hello", "Say hello", move |conv: Conversation| {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            conv.reply("hi!").await
        }
    })
    .unwrap();
    let session = tokio::spawn(bot.listen());

    // channel chatter without a mention is ignored
    peer.send(Message::text("C1", "hello").with_user("U1"));
    peer.send(Message::text("D1", "hello").with_user("U1"));

    let reply = next_reply(&mut peer).await;
    assert_eq!(reply.channel, "D1");
    assert_eq!(reply.text, "hi!");
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    peer.hang_up();
    assert!(session.await.unwrap().is_ok());
    assert!(peer.is_closed());
}

#[tokio::test]
async fn test_overlapping_patterns_each_reply() {
    let (mut bot, mut peer) = bot();
    bot.register_command("deploy <env>", "Deploy anywhere", |conv: Conversation| async move {
        let env = conv.string("env")?.to_string();
        conv.reply(format!("generic {}", env)).await
    })
    .unwrap();
    bot.command("deploy production", |conv: Conversation| async move {
        conv.reply("specific").await
    })
    .unwrap();
    let session = tokio::spawn(bot.listen());

    peer.send(Message::text("C1", "<@UBOT> deploy production").with_user("U1"));

    let mut replies = vec![next_reply(&mut peer).await.text, next_reply(&mut peer).await.text];
    replies.sort();
    assert_eq!(replies, vec!["<@U1>: generic production", "<@U1>: specific"]);

    peer.hang_up();
    session.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_help_listing() {
    let (mut bot, mut peer) = bot();
    bot.register_command("ping", "Check the bot is alive", |conv: Conversation| async move {
        conv.reply("pong").await
    })
    .unwrap();
    let session = tokio::spawn(bot.listen());

    peer.send(Message::text("C1", "<@UBOT>: help").with_user("U1"));
    let reply = next_reply(&mut peer).await;
    assert_eq!(reply.channel, "C1");
    assert_eq!(
        reply.text,
        "<@U1>: Thanks for asking! I can support you with those features:\n\n`ping` *–* Check the bot is alive\n"
    );

    peer.send(Message::text("D1", "help").with_user("U1"));
    let reply = next_reply(&mut peer).await;
    assert!(reply.text.starts_with("Thanks for asking!"));

    peer.hang_up();
    session.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_failing_handler_keeps_session_alive() {
    let (mut bot, mut peer) = bot();
    bot.command("explode", |_conv: Conversation| async {
        Err::<(), _>(CommandError::ExecutionFailed("boom".to_string()))
    })
    .unwrap();
    bot.command("ping", |conv: Conversation| async move { conv.reply("pong").await })
        .unwrap();
    let session = tokio::spawn(bot.listen());

    peer.send(Message::text("D1", "explode").with_user("U1"));
    peer.send(Message::text("D1", "ping").with_user("U1"));
    assert_eq!(next_reply(&mut peer).await.text, "pong");

    peer.hang_up();
    session.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_acknowledged_heartbeats_continue_until_peer_goes_silent() {
    let (transport, mut peer) = memory::channel();
    let session = tokio::spawn(Bot::new("UBOT", transport).listen());

    let first = peer.next_outbound().await.unwrap();
    assert_eq!(first.kind, "ping");
    assert_eq!(first.id, 101);
    peer.send(Message::pong(first.id));

    let second = peer.next_outbound().await.unwrap();
    assert_eq!(second.kind, "ping");
    assert!(second.id > first.id);

    // no acknowledgment this time
    let err = session.await.unwrap().unwrap_err();
    assert!(matches!(err, BotError::AckTimeout(_)), "unexpected error: {}", err);
    peer.wait_closed().await;
    assert_eq!(peer.close_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_pong_is_an_acknowledgment_not_content() {
    let (transport, mut peer) = memory::channel();
    let mut bot = Bot::new("UBOT", transport);
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    bot.command("ping", move |conv: Conversation| {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            conv.reply("pong").await
        }
    })
    .unwrap();
    let session = tokio::spawn(bot.listen());

    let heartbeat = peer.next_outbound().await.unwrap();
    // a pong carrying text that would match a command if it were content
    peer.send(Message {
        channel: "D1".to_string(),
        text: "ping".to_string(),
        user: "U1".to_string(),
        ..Message::pong(heartbeat.id)
    });

    // the acknowledgment kept the session alive until the next heartbeat
    let next = peer.next_outbound().await.expect("session still open");
    assert_eq!(next.kind, "ping");
    assert!(next.id > heartbeat.id);
    assert!(next.text.is_empty());
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    peer.hang_up();
    session.await.unwrap().unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}
