//! UseCase: Typing & Batch Coordinator
//!
//! 誰が入力中か、どのメッセージが送信待ちかを追跡し、
//! 「全員が入力を終えた瞬間」にバッチを閉じる。
//!
//! ### どのような状況を想定しているか
//! - 正常系：入力中の参加者がいなければ即座にバッチが閉じる
//! - 正常系：入力中の参加者がいる間は送信待ちに溜まる
//! - エッジケース：同時に複数の flush 判定が走っても 1 回しか成立しない

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use crate::domain::{
    MessageId, Participant, PendingMessage, SessionState, StateSlot, Timestamp, TypingParticipant,
    UserId,
};
use gamejam_shared::time::Clock;

use super::error::BatchError;

pub struct BatchCoordinator {
    state: SessionState,
    clock: Arc<dyn Clock>,
    /// Set from a successful flush until the resulting response finishes
    processing: AtomicBool,
}

impl BatchCoordinator {
    pub fn new(state: SessionState, clock: Arc<dyn Clock>) -> Self {
        Self {
            state,
            clock,
            processing: AtomicBool::new(false),
        }
    }

    fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }

    /// Report a participant's composer status.
    ///
    /// Ignored while the participant already has a message queued.
    pub async fn set_typing_status(
        &self,
        participant: &Participant,
        is_composing: bool,
        draft: &str,
    ) -> Result<(), BatchError> {
        let pending = self.state.pending_messages().await?;
        if pending.iter().any(|m| m.user_id == participant.id) {
            return Ok(());
        }

        let is_typing = is_composing || !draft.trim().is_empty();
        let now = self.now();
        self.state
            .modify(
                StateSlot::TypingParticipants,
                |typing: &mut Vec<TypingParticipant>| {
                    typing.retain(|t| t.id != participant.id);
                    if is_typing {
                        typing.push(TypingParticipant::from_participant(participant, now));
                    }
                },
            )
            .await?;
        Ok(())
    }

    /// Queue a message and immediately check whether the batch can close.
    ///
    /// Returns the result of [`Self::try_flush`].
    pub async fn enqueue(&self, participant: &Participant, text: &str) -> Result<bool, BatchError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(BatchError::EmptyMessage);
        }

        let message = PendingMessage {
            id: MessageId::generate(),
            user_id: participant.id.clone(),
            display_name: participant.display_name.clone(),
            avatar: participant.avatar.clone(),
            text: text.to_string(),
            submitted_at: self.now(),
        };
        self.state
            .modify(
                StateSlot::PendingMessages,
                |pending: &mut Vec<PendingMessage>| pending.push(message),
            )
            .await?;
        self.remove_typing(&participant.id).await?;

        tracing::debug!(
            "Queued message from '{}' in session '{}'",
            participant.id,
            self.state.session_id()
        );
        self.try_flush().await
    }

    /// Close the batch iff nobody is composing, something is queued and no
    /// batch is already in progress. Only one concurrent caller can win.
    pub async fn try_flush(&self) -> Result<bool, BatchError> {
        if self.processing.load(Ordering::SeqCst) {
            return Ok(false);
        }
        if !self.state.typing_participants().await?.is_empty() {
            return Ok(false);
        }
        if self.state.pending_messages().await?.is_empty() {
            return Ok(false);
        }

        let won = self
            .state
            .modify(StateSlot::BatchInProgress, |in_progress: &mut bool| {
                if *in_progress {
                    false
                } else {
                    *in_progress = true;
                    true
                }
            })
            .await?;

        if won {
            self.processing.store(true, Ordering::SeqCst);
            tracing::info!("Batch closed in session '{}'", self.state.session_id());
        }
        Ok(won)
    }

    /// Take every queued message in submission order and reopen the batch flag.
    pub async fn drain_batch(&self) -> Result<Vec<PendingMessage>, BatchError> {
        let drained = self
            .state
            .modify(
                StateSlot::PendingMessages,
                |pending: &mut Vec<PendingMessage>| std::mem::take(pending),
            )
            .await?;
        self.state.write(StateSlot::BatchInProgress, &false).await?;
        Ok(drained)
    }

    /// Allow the next batch cycle once the response has finished or failed.
    pub fn reset_processing_state(&self) {
        self.processing.store(false, Ordering::SeqCst);
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::SeqCst)
    }

    /// Drop a participant's typing entry (submit or disconnect).
    pub async fn remove_typing(&self, user: &UserId) -> Result<(), BatchError> {
        self.state
            .modify(
                StateSlot::TypingParticipants,
                |typing: &mut Vec<TypingParticipant>| typing.retain(|t| &t.id != user),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{domain::SessionId, infrastructure::state_channel::InMemoryStateChannel};
    use gamejam_shared::time::FixedClock;

    fn participant(id: &str) -> Participant {
        Participant::new(UserId::new(id.to_string()).unwrap(), id.to_uppercase(), None)
    }

    fn create_coordinator() -> (BatchCoordinator, SessionState) {
        let state = SessionState::new(
            SessionId::new("pong".to_string()).unwrap(),
            Arc::new(InMemoryStateChannel::new()),
        );
        let coordinator = BatchCoordinator::new(state.clone(), Arc::new(FixedClock::new(1_000)));
        (coordinator, state)
    }

    #[tokio::test]
    async fn test_typing_status_follows_focus_and_draft() {
        // テスト項目: フォーカスか下書きがあれば入力中、どちらもなければ入力中でなくなる
        // given (前提条件):
        let (coordinator, state) = create_coordinator();
        let alice = participant("alice");

        // when (操作):
        coordinator.set_typing_status(&alice, false, "pong").await.unwrap();
        let while_drafting = state.typing_participants().await.unwrap();
        coordinator.set_typing_status(&alice, true, "").await.unwrap();
        let while_focused = state.typing_participants().await.unwrap();
        coordinator.set_typing_status(&alice, false, "   ").await.unwrap();
        let after_clear = state.typing_participants().await.unwrap();

        // then (期待する結果):
        assert_eq!(while_drafting.len(), 1);
        assert_eq!(while_drafting[0].display_name, "ALICE");
        assert_eq!(while_focused.len(), 1);
        assert!(after_clear.is_empty());
    }

    #[tokio::test]
    async fn test_typing_status_ignored_while_message_queued() {
        // テスト項目: 送信待ちのメッセージがある参加者の入力状態は無視される
        // given (前提条件):
        let (coordinator, state) = create_coordinator();
        let alice = participant("alice");
        let bob = participant("bob");
        coordinator.set_typing_status(&bob, true, "").await.unwrap();
        coordinator.enqueue(&alice, "make pong").await.unwrap();

        // when (操作):
        coordinator.set_typing_status(&alice, true, "more").await.unwrap();

        // then (期待する結果):
        let typing = state.typing_participants().await.unwrap();
        assert_eq!(typing.len(), 1);
        assert_eq!(typing[0].id, bob.id);
    }

    #[tokio::test]
    async fn test_enqueue_rejects_blank_text() {
        // テスト項目: 空白のみのメッセージは送信待ちに追加されない
        // given (前提条件):
        let (coordinator, state) = create_coordinator();

        // when (操作):
        let result = coordinator.enqueue(&participant("alice"), "  \n ").await;

        // then (期待する結果):
        assert_eq!(result, Err(BatchError::EmptyMessage));
        assert!(state.pending_messages().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_try_flush_never_fires_twice() {
        // テスト項目: drain せずに try_flush を 2 回呼んでも true は 1 回だけ
        // given (前提条件):
        let (coordinator, state) = create_coordinator();
        coordinator.enqueue(&participant("alice"), "make pong").await.unwrap();
        coordinator.reset_processing_state();
        state.write(StateSlot::BatchInProgress, &false).await.unwrap();

        // when (操作):
        let first = coordinator.try_flush().await.unwrap();
        let second = coordinator.try_flush().await.unwrap();

        // then (期待する結果):
        assert!(first);
        assert!(!second);
        assert!(state.batch_in_progress().await.unwrap());
    }

    #[tokio::test]
    async fn test_try_flush_gating_rule() {
        // テスト項目: 入力中の参加者がいる、または送信待ちが空の場合は flush しない
        // given (前提条件):
        let (coordinator, _state) = create_coordinator();
        let alice = participant("alice");
        let bob = participant("bob");

        // when (操作):
        let with_empty_queue = coordinator.try_flush().await.unwrap();
        coordinator.set_typing_status(&bob, true, "").await.unwrap();
        let enqueued = coordinator.enqueue(&alice, "make pong").await.unwrap();

        // then (期待する結果):
        assert!(!with_empty_queue);
        assert!(!enqueued);
    }

    #[tokio::test]
    async fn test_concurrent_flush_has_single_winner() {
        // テスト項目: 並行した flush 判定のうち成立するのは 1 つだけ
        // given (前提条件):
        let (coordinator, state) = create_coordinator();
        let coordinator = Arc::new(coordinator);
        state
            .write(
                StateSlot::PendingMessages,
                &vec![PendingMessage {
                    id: MessageId::generate(),
                    user_id: UserId::new("alice".to_string()).unwrap(),
                    display_name: "Alice".to_string(),
                    avatar: None,
                    text: "make pong".to_string(),
                    submitted_at: Timestamp::new(0),
                }],
            )
            .await
            .unwrap();

        // when (操作):
        let mut handles = Vec::new();
        for _ in 0..10 {
            let coordinator = coordinator.clone();
            handles.push(tokio::spawn(async move { coordinator.try_flush().await.unwrap() }));
        }
        let mut wins = 0;
        for handle in handles {
            if handle.await.unwrap() {
                wins += 1;
            }
        }

        // then (期待する結果):
        assert_eq!(wins, 1);
    }

    #[tokio::test]
    async fn test_batch_waits_for_other_composer() {
        // テスト項目: bob が入力中の間は alice のメッセージは溜まり、bob が入力をやめると 1 件のバッチとして閉じる
        // given (前提条件):
        let (coordinator, state) = create_coordinator();
        let alice = participant("alice");
        let bob = participant("bob");
        coordinator.set_typing_status(&alice, true, "make").await.unwrap();
        coordinator.set_typing_status(&bob, true, "").await.unwrap();

        // when (操作):
        let flushed_on_submit = coordinator.enqueue(&alice, "make a pong game").await.unwrap();
        coordinator.set_typing_status(&bob, false, "").await.unwrap();
        let flushed_after_bob = coordinator.try_flush().await.unwrap();
        let batch = coordinator.drain_batch().await.unwrap();

        // then (期待する結果):
        assert!(!flushed_on_submit);
        assert!(flushed_after_bob);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].user_id, alice.id);
        assert!(state.pending_messages().await.unwrap().is_empty());
        assert!(!state.batch_in_progress().await.unwrap());
    }

    #[tokio::test]
    async fn test_two_submissions_form_one_batch() {
        // テスト項目: 両者が入力状態の解除前に送信すると、2 件が送信順のまま 1 つのバッチになる
        // given (前提条件):
        let (coordinator, _state) = create_coordinator();
        let alice = participant("alice");
        let bob = participant("bob");
        coordinator.set_typing_status(&alice, true, "").await.unwrap();
        coordinator.set_typing_status(&bob, true, "").await.unwrap();

        // when (操作):
        let first = coordinator.enqueue(&alice, "make pong").await.unwrap();
        let second = coordinator.enqueue(&bob, "add powerups").await.unwrap();
        let batch = coordinator.drain_batch().await.unwrap();

        // then (期待する結果):
        assert!(!first);
        assert!(second);
        let texts: Vec<&str> = batch.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["make pong", "add powerups"]);
    }

    #[tokio::test]
    async fn test_no_flush_while_processing() {
        // テスト項目: 前のバッチの応答中は新しいバッチが閉じず、reset 後に閉じる
        // given (前提条件):
        let (coordinator, _state) = create_coordinator();
        coordinator.enqueue(&participant("alice"), "make pong").await.unwrap();
        coordinator.drain_batch().await.unwrap();

        // when (操作):
        let during = coordinator.enqueue(&participant("bob"), "faster").await.unwrap();
        coordinator.reset_processing_state();
        let after = coordinator.try_flush().await.unwrap();

        // then (期待する結果):
        assert!(!during);
        assert!(after);
    }

    #[tokio::test]
    async fn test_same_user_may_queue_twice() {
        // テスト項目: 同じ参加者が flush 前に 2 回送信すると、2 件とも送信待ちに残る
        // given (前提条件):
        let (coordinator, state) = create_coordinator();
        let alice = participant("alice");
        coordinator.set_typing_status(&participant("bob"), true, "").await.unwrap();

        // when (操作):
        coordinator.enqueue(&alice, "one").await.unwrap();
        coordinator.enqueue(&alice, "two").await.unwrap();

        // then (期待する結果):
        assert_eq!(state.pending_messages().await.unwrap().len(), 2);
    }
}
