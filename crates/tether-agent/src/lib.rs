// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command dispatcher for the Tether agent.
//!
//! The [`AgentLoop`] is the central coordinator that:
//! - Receives turns from a conversation channel adapter
//! - Routes each turn to a per-user worker task over an mpsc channel
//! - Lets the worker drive the auth state machine or a menu action
//! - Handles graceful shutdown
//!
//! One worker per user gives per-user serialization for free: turns from one
//! user are handled in arrival order, while different users proceed
//! concurrently.

pub mod actions;
pub mod recording;
pub mod shutdown;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use tether_auth::{AuthMachine, AuthState, Prompt, SessionRegistry};
use tether_core::{
    menu, ConversationChannel, InboundTurn, Keyboard, OutboundTurn, StorageAdapter, TetherError,
    TurnContent, UserId,
};

use crate::actions::ActionState;

/// How long an idle worker waits for the next turn before its task exits.
const WORKER_IDLE_TTL: Duration = Duration::from_secs(30 * 60);

/// Shared services every worker needs.
pub struct AgentDeps {
    pub storage: Arc<dyn StorageAdapter>,
    pub registry: Arc<SessionRegistry>,
    pub machine: AuthMachine,
}

impl AgentDeps {
    pub fn new(storage: Arc<dyn StorageAdapter>, registry: Arc<SessionRegistry>) -> Self {
        let machine = AuthMachine::new(storage.clone(), registry.clone());
        Self {
            storage,
            registry,
            machine,
        }
    }
}

/// What one user's conversation is currently doing.
enum Flow {
    /// Nothing pending; turns are menu input.
    Idle,
    /// An authentication flow is in progress.
    Auth(AuthState),
    /// A menu action is waiting for more input.
    Action(ActionState),
}

pub(crate) struct Worker {
    pub(crate) tx: mpsc::Sender<InboundTurn>,
    pub(crate) handle: JoinHandle<()>,
}

/// The main loop that routes inbound turns to per-user workers.
pub struct AgentLoop {
    channel: Arc<dyn ConversationChannel>,
    deps: Arc<AgentDeps>,
    workers: HashMap<UserId, Worker>,
}

impl AgentLoop {
    pub fn new(channel: Arc<dyn ConversationChannel>, deps: Arc<AgentDeps>) -> Self {
        Self {
            channel,
            deps,
            workers: HashMap::new(),
        }
    }

    /// Runs until the cancellation token is triggered, then drains workers,
    /// closes every live provider connection, and closes storage.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<(), TetherError> {
        info!("agent loop running");

        loop {
            tokio::select! {
                turn = self.channel.receive() => {
                    match turn {
                        Ok(turn) => self.route(turn).await,
                        Err(TetherError::ChannelClosed) => {
                            info!("conversation channel closed, stopping agent loop");
                            break;
                        }
                        Err(e) => {
                            error!(error = %e, "channel receive error");
                        }
                    }
                }
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, stopping agent loop");
                    break;
                }
            }
        }

        shutdown::drain_workers(self.workers.drain().collect(), Duration::from_secs(10)).await;
        self.deps.registry.close_all().await;
        self.deps.storage.close().await?;

        info!("agent loop stopped");
        Ok(())
    }

    /// Hands the turn to the user's worker, spawning one on first contact.
    async fn route(&mut self, turn: InboundTurn) {
        let user = turn.user;
        recording::record_turn_in();
        self.reap_finished();

        if let Some(worker) = self.workers.get(&user) {
            match worker.tx.send(turn).await {
                Ok(()) => return,
                Err(mpsc::error::SendError(turn)) => {
                    // Worker died; replace it and retry once.
                    warn!(%user, "worker gone, respawning");
                    self.workers.remove(&user);
                    self.spawn_worker(user).await;
                    if let Some(worker) = self.workers.get(&user)
                        && let Err(e) = worker.tx.send(turn).await
                    {
                        error!(%user, error = %e, "failed to deliver turn to fresh worker");
                    }
                    return;
                }
            }
        }

        self.spawn_worker(user).await;
        if let Some(worker) = self.workers.get(&user)
            && let Err(e) = worker.tx.send(turn).await
        {
            error!(%user, error = %e, "failed to deliver turn to new worker");
        }
    }

    async fn spawn_worker(&mut self, user: UserId) {
        let (tx, mut rx) = mpsc::channel::<InboundTurn>(32);
        let mut worker = UserWorker::new(user, self.channel.clone(), self.deps.clone());

        let handle = tokio::spawn(async move {
            loop {
                match tokio::time::timeout(WORKER_IDLE_TTL, rx.recv()).await {
                    Ok(Some(turn)) => worker.handle(turn).await,
                    Ok(None) => break,
                    Err(_) if worker.is_idle() => {
                        // Refuse further sends, then drain anything that
                        // raced in before exiting.
                        rx.close();
                        while let Ok(turn) = rx.try_recv() {
                            worker.handle(turn).await;
                        }
                        debug!(%user, "worker idle past TTL");
                        break;
                    }
                    Err(_) => {}
                }
            }
            debug!(%user, "worker exited");
        });

        self.workers.insert(user, Worker { tx, handle });
        recording::set_active_workers(self.workers.len() as f64);
        debug!(%user, "worker spawned");
    }

    /// Drops map entries whose worker task has already exited.
    fn reap_finished(&mut self) {
        let before = self.workers.len();
        self.workers.retain(|_, worker| !worker.handle.is_finished());
        if self.workers.len() != before {
            recording::set_active_workers(self.workers.len() as f64);
        }
    }
}

/// Handles all turns of one user, in order.
pub struct UserWorker {
    user: UserId,
    channel: Arc<dyn ConversationChannel>,
    deps: Arc<AgentDeps>,
    flow: Flow,
}

impl UserWorker {
    pub fn new(user: UserId, channel: Arc<dyn ConversationChannel>, deps: Arc<AgentDeps>) -> Self {
        Self {
            user,
            channel,
            deps,
            flow: Flow::Idle,
        }
    }

    /// Whether nothing is pending for this user.
    fn is_idle(&self) -> bool {
        matches!(self.flow, Flow::Idle)
    }

    /// Processes one turn and delivers the resulting prompts.
    ///
    /// Infrastructure failures (storage) abort whatever was pending and are
    /// reported to the user; the conversation resets to idle.
    pub async fn handle(&mut self, turn: InboundTurn) {
        let chat_id = turn.chat_id.clone();
        let prompts = match self.dispatch(&turn).await {
            Ok(prompts) => prompts,
            Err(e) => {
                error!(user = %self.user, error = %e, "turn failed");
                self.flow = Flow::Idle;
                vec![Prompt::text(
                    "Something went wrong on our side and the current step was cancelled. \
                     Send /start to begin again.",
                )]
            }
        };

        for prompt in prompts {
            let out = match prompt.keyboard {
                Some(keyboard) => OutboundTurn::with_keyboard(chat_id.clone(), prompt.text, keyboard),
                None => OutboundTurn::text(chat_id.clone(), prompt.text),
            };
            recording::record_turn_out();
            if let Err(e) = self.channel.send(out).await {
                error!(user = %self.user, error = %e, "failed to send reply");
            }
        }
    }

    async fn dispatch(&mut self, turn: &InboundTurn) -> Result<Vec<Prompt>, TetherError> {
        // /start cancels whatever is pending, from any state.
        if let TurnContent::Text(text) = &turn.content
            && text.trim() == "/start"
        {
            self.flow = Flow::Idle;
            return Ok(vec![Prompt::with_keyboard(
                "What should the connected account do?",
                Keyboard::MainMenu,
            )]);
        }

        match std::mem::replace(&mut self.flow, Flow::Idle) {
            Flow::Auth(state) => {
                let (next, prompts) = self
                    .deps
                    .machine
                    .on_turn(self.user, state, &turn.content)
                    .await?;
                if next.in_progress() {
                    self.flow = Flow::Auth(next);
                }
                Ok(prompts)
            }
            Flow::Action(state) => self.on_action_input(state, &turn.content).await,
            Flow::Idle => self.on_idle(&turn.content).await,
        }
    }

    async fn begin_auth(&mut self) -> Result<Vec<Prompt>, TetherError> {
        let (state, prompts) = self.deps.machine.begin(self.user).await?;
        if state.in_progress() {
            self.flow = Flow::Auth(state);
        }
        Ok(prompts)
    }

    async fn on_idle(&mut self, content: &TurnContent) -> Result<Vec<Prompt>, TetherError> {
        match content {
            TurnContent::Selection(cb) if cb == menu::CB_AUTH_START => self.begin_auth().await,
            TurnContent::Selection(cb) if cb == menu::CB_LOGOUT => {
                actions::logout(&self.deps, self.user).await
            }
            TurnContent::Selection(cb) if cb == menu::CB_GHOST_ON => {
                actions::set_ghost(&self.deps, self.user, true).await
            }
            TurnContent::Selection(cb) if cb == menu::CB_GHOST_OFF => {
                actions::set_ghost(&self.deps, self.user, false).await
            }
            TurnContent::Selection(_) => Ok(vec![Prompt::with_keyboard(
                "That option is no longer active.",
                Keyboard::MainMenu,
            )]),
            TurnContent::Text(text) => match text.trim() {
                menu::LABEL_SIGN_IN => self.begin_auth().await,
                menu::LABEL_ACCOUNT => actions::account_info(&self.deps, self.user).await,
                menu::LABEL_GHOST => actions::ghost_menu(&self.deps, self.user).await,
                menu::LABEL_SEND => {
                    self.start_action(
                        ActionState::AwaitSendTarget,
                        "Who should receive the message? Send a @username or chat id.",
                    )
                    .await
                }
                menu::LABEL_PURGE => {
                    self.start_action(
                        ActionState::AwaitPurgeTarget,
                        "Which chat should be purged of your own recent messages? \
                         Send a @username or chat id.",
                    )
                    .await
                }
                _ => Ok(vec![Prompt::with_keyboard(
                    "Pick an option from the menu, or send /start.",
                    Keyboard::MainMenu,
                )]),
            },
        }
    }

    /// Starts a connection-backed menu action, gating on authentication.
    async fn start_action(
        &mut self,
        state: ActionState,
        prompt: &str,
    ) -> Result<Vec<Prompt>, TetherError> {
        if !self.deps.registry.is_authenticated(self.user).await {
            return Ok(actions::not_authenticated());
        }
        self.flow = Flow::Action(state);
        Ok(vec![Prompt::text(prompt)])
    }

    async fn on_action_input(
        &mut self,
        state: ActionState,
        content: &TurnContent,
    ) -> Result<Vec<Prompt>, TetherError> {
        let TurnContent::Text(text) = content else {
            self.flow = Flow::Action(state);
            return Ok(vec![Prompt::text(
                "Type your answer, or send /start to cancel.",
            )]);
        };

        match state {
            ActionState::AwaitSendTarget => {
                self.flow = Flow::Action(ActionState::AwaitSendText {
                    target: text.trim().to_string(),
                });
                Ok(vec![Prompt::text("Now send the message text.")])
            }
            ActionState::AwaitSendText { target } => {
                actions::send_message(&self.deps, self.user, &target, text).await
            }
            ActionState::AwaitPurgeTarget => {
                actions::purge(&self.deps, self.user, text.trim()).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tether_core::Credentials;
    use tether_test_utils::mock_provider::Step;
    use tether_test_utils::{MemoryStorage, MockChannel, MockProvider};

    const USER: UserId = UserId(7);

    struct Fixture {
        provider: Arc<MockProvider>,
        storage: Arc<MemoryStorage>,
        channel: Arc<MockChannel>,
        deps: Arc<AgentDeps>,
    }

    fn fixture() -> Fixture {
        let provider = Arc::new(MockProvider::new());
        let storage = Arc::new(MemoryStorage::new());
        let channel = Arc::new(MockChannel::new());
        let registry = Arc::new(SessionRegistry::new(
            provider.clone(),
            Duration::from_millis(200),
            Duration::from_millis(100),
        ));
        let deps = Arc::new(AgentDeps::new(storage.clone(), registry));
        Fixture {
            provider,
            storage,
            channel,
            deps,
        }
    }

    fn worker(f: &Fixture) -> UserWorker {
        UserWorker::new(USER, f.channel.clone(), f.deps.clone())
    }

    fn text_turn(s: &str) -> InboundTurn {
        InboundTurn {
            user: USER,
            chat_id: "chat-7".into(),
            content: TurnContent::Text(s.into()),
        }
    }

    fn selection_turn(s: &str) -> InboundTurn {
        InboundTurn {
            user: USER,
            chat_id: "chat-7".into(),
            content: TurnContent::Selection(s.into()),
        }
    }

    async fn last_sent(f: &Fixture) -> OutboundTurn {
        f.channel.sent_turns().await.last().cloned().expect("a reply was sent")
    }

    /// Open and authorize a connection outside the dialogue, as if the user
    /// had completed sign-in earlier.
    async fn authenticate(f: &Fixture) {
        let creds = Credentials {
            api_id: 1,
            api_hash: "h".into(),
        };
        let conn = f.deps.registry.open(USER, &creds, "+100").await.unwrap();
        let mut guard = conn.lock().await;
        let sent = guard.send_code("+100").await.unwrap();
        guard
            .sign_in("+100", &sent.delivery_token, "1234")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn start_shows_main_menu() {
        let f = fixture();
        let mut w = worker(&f);
        w.handle(text_turn("/start")).await;

        let reply = last_sent(&f).await;
        assert_eq!(reply.keyboard, Some(Keyboard::MainMenu));
        assert_eq!(reply.chat_id, "chat-7");
    }

    #[tokio::test]
    async fn full_auth_dialogue_signs_in() {
        let f = fixture();
        let mut w = worker(&f);

        w.handle(text_turn(menu::LABEL_SIGN_IN)).await;
        assert!(last_sent(&f).await.text.contains("api_id"));

        w.handle(text_turn("12345 abcdef0123456789")).await;
        assert!(last_sent(&f).await.text.contains("phone"));

        w.handle(text_turn("79990001122")).await;
        assert!(last_sent(&f).await.text.contains("verification code"));

        w.handle(text_turn("12 34")).await;
        let reply = last_sent(&f).await;
        assert!(reply.text.contains("Signed in as Mock"));
        assert_eq!(reply.keyboard, Some(Keyboard::MainMenu));
        assert!(f.deps.registry.is_authenticated(USER).await);
    }

    #[tokio::test]
    async fn start_auth_callback_begins_the_flow() {
        let f = fixture();
        let mut w = worker(&f);
        w.handle(selection_turn(menu::CB_AUTH_START)).await;
        assert!(last_sent(&f).await.text.contains("api_id"));
    }

    #[tokio::test]
    async fn start_cancels_a_pending_action() {
        let f = fixture();
        authenticate(&f).await;
        let mut w = worker(&f);

        w.handle(text_turn(menu::LABEL_SEND)).await;
        w.handle(text_turn("/start")).await;
        // The next text is menu input again, not a send target.
        w.handle(text_turn("gibberish")).await;

        let reply = last_sent(&f).await;
        assert!(reply.text.contains("Pick an option"));
        assert!(f.provider.stats().sent_messages().is_empty());
    }

    #[tokio::test]
    async fn actions_require_authentication() {
        let f = fixture();
        let mut w = worker(&f);

        for label in [menu::LABEL_SEND, menu::LABEL_PURGE] {
            w.handle(text_turn(label)).await;
            let reply = last_sent(&f).await;
            assert_eq!(reply.keyboard, Some(Keyboard::StartAuth));
            assert!(reply.text.contains("no connected account"));
        }
    }

    #[tokio::test]
    async fn send_message_flow_delivers_through_the_handle() {
        let f = fixture();
        authenticate(&f).await;
        let mut w = worker(&f);

        w.handle(text_turn(menu::LABEL_SEND)).await;
        w.handle(text_turn("@friend")).await;
        w.handle(text_turn("hello from afar")).await;

        assert!(last_sent(&f).await.text.contains("Sent"));
        assert_eq!(
            f.provider.stats().sent_messages(),
            vec![("@friend".to_string(), "hello from afar".to_string())]
        );
    }

    #[tokio::test]
    async fn purge_deletes_recent_own_messages() {
        let f = fixture();
        authenticate(&f).await;
        let mut w = worker(&f);

        w.handle(text_turn(menu::LABEL_PURGE)).await;
        w.handle(text_turn("@group")).await;

        assert!(last_sent(&f).await.text.contains("Deleted 3"));
        assert_eq!(
            f.provider.stats().deleted_messages(),
            vec![("@group".to_string(), vec![3, 2, 1])]
        );
    }

    #[tokio::test]
    async fn purge_with_nothing_to_delete_says_so() {
        let f = fixture();
        authenticate(&f).await;
        f.provider
            .script()
            .await
            .recent_own_messages
            .push_back(Step::Return(vec![]));
        let mut w = worker(&f);

        w.handle(text_turn(menu::LABEL_PURGE)).await;
        w.handle(text_turn("@group")).await;

        assert!(last_sent(&f).await.text.contains("none"));
        assert!(f.provider.stats().deleted_messages().is_empty());
    }

    #[tokio::test]
    async fn account_info_renders_a_card_with_logout() {
        let f = fixture();
        authenticate(&f).await;
        let mut w = worker(&f);

        w.handle(text_turn(menu::LABEL_ACCOUNT)).await;
        let reply = last_sent(&f).await;
        assert!(reply.text.contains("Mock"));
        assert!(reply.text.contains("777000"));
        assert_eq!(reply.keyboard, Some(Keyboard::AccountActions));
    }

    #[tokio::test]
    async fn account_info_without_connection_offers_sign_in() {
        let f = fixture();
        let mut w = worker(&f);

        w.handle(text_turn(menu::LABEL_ACCOUNT)).await;
        assert_eq!(last_sent(&f).await.keyboard, Some(Keyboard::StartAuth));
    }

    #[tokio::test]
    async fn logout_tears_everything_down() {
        let f = fixture();
        authenticate(&f).await;
        let mut w = worker(&f);

        w.handle(selection_turn(menu::CB_LOGOUT)).await;

        assert!(last_sent(&f).await.text.contains("Logged out"));
        assert_eq!(f.deps.registry.len(), 0);
        assert_eq!(
            f.provider
                .stats()
                .logouts
                .load(std::sync::atomic::Ordering::SeqCst),
            1
        );
    }

    #[tokio::test]
    async fn ghost_toggle_persists_the_flag() {
        let f = fixture();
        let mut w = worker(&f);

        w.handle(text_turn(menu::LABEL_GHOST)).await;
        let reply = last_sent(&f).await;
        assert!(reply.text.contains("off"));
        assert_eq!(reply.keyboard, Some(Keyboard::GhostToggle { enabled: false }));

        w.handle(selection_turn(menu::CB_GHOST_ON)).await;
        assert!(f.storage.ghost_mode(USER).await.unwrap());
        let reply = last_sent(&f).await;
        assert_eq!(reply.keyboard, Some(Keyboard::GhostToggle { enabled: true }));
    }

    #[tokio::test]
    async fn storage_failure_resets_the_conversation() {
        let f = fixture();
        let mut w = worker(&f);

        f.storage.fail_next();
        w.handle(text_turn(menu::LABEL_GHOST)).await;
        assert!(last_sent(&f).await.text.contains("went wrong"));

        // The conversation is usable again afterwards.
        w.handle(text_turn(menu::LABEL_GHOST)).await;
        assert!(last_sent(&f).await.text.contains("Ghost mode"));
    }

    #[tokio::test]
    async fn stale_selection_gets_a_hint() {
        let f = fixture();
        let mut w = worker(&f);
        w.handle(selection_turn("auth:resend")).await;
        assert!(last_sent(&f).await.text.contains("no longer active"));
    }

    #[tokio::test]
    async fn agent_loop_routes_and_shuts_down() {
        let f = fixture();
        let mut agent = AgentLoop::new(f.channel.clone(), f.deps.clone());
        let cancel = CancellationToken::new();
        let run = {
            let cancel = cancel.clone();
            tokio::spawn(async move { agent.run(cancel).await })
        };

        f.channel.inject(text_turn("/start")).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(f.channel.sent_count().await, 1);

        cancel.cancel();
        run.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn agent_loop_stops_when_the_channel_closes() {
        let f = fixture();
        let mut agent = AgentLoop::new(f.channel.clone(), f.deps.clone());
        let run = tokio::spawn(async move { agent.run(CancellationToken::new()).await });

        f.channel.inject(text_turn("/start")).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(f.channel.sent_count().await, 1);

        // No cancellation: the closed channel alone must end the loop.
        f.channel.close();
        run.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn finished_workers_are_reaped_on_new_traffic() {
        let f = fixture();
        let mut agent = AgentLoop::new(f.channel.clone(), f.deps.clone());

        agent.spawn_worker(UserId(1)).await;
        agent.workers.get(&UserId(1)).unwrap().handle.abort();
        while !agent.workers.get(&UserId(1)).unwrap().handle.is_finished() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        agent.route(text_turn("/start")).await;

        assert!(!agent.workers.contains_key(&UserId(1)));
        assert!(agent.workers.contains_key(&USER));
    }

    #[tokio::test(start_paused = true)]
    async fn idle_worker_exits_after_the_ttl() {
        let f = fixture();
        let mut agent = AgentLoop::new(f.channel.clone(), f.deps.clone());

        agent.route(text_turn("/start")).await;
        while f.channel.sent_count().await < 1 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        tokio::time::sleep(WORKER_IDLE_TTL + Duration::from_secs(1)).await;
        while !agent.workers.get(&USER).unwrap().handle.is_finished() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        // The next turn goes through a fresh worker.
        agent.route(text_turn("/start")).await;
        while f.channel.sent_count().await < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn users_are_isolated() {
        let f = fixture();
        let mut agent = AgentLoop::new(f.channel.clone(), f.deps.clone());
        let cancel = CancellationToken::new();
        let run = {
            let cancel = cancel.clone();
            tokio::spawn(async move { agent.run(cancel).await })
        };

        for user in [UserId(1), UserId(2)] {
            f.channel
                .inject(InboundTurn {
                    user,
                    chat_id: user.to_string(),
                    content: TurnContent::Text("/start".into()),
                })
                .await;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;

        let sent = f.channel.sent_turns().await;
        assert_eq!(sent.len(), 2);
        let chats: Vec<&str> = sent.iter().map(|t| t.chat_id.as_str()).collect();
        assert!(chats.contains(&"1") && chats.contains(&"2"));

        cancel.cancel();
        run.await.unwrap().unwrap();
    }
}
