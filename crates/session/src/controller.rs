//! The session state machine.
//!
//! `SessionController` owns the conversation, the voice status and the three
//! voice components. It never blocks: collaborator calls run in spawned tasks
//! that report back as [`Internal`] events tagged with a turn id or playback
//! epoch, and every timer is a deadline the runtime sleeps on.

use std::sync::Arc;

use futures::StreamExt;
use reflect_audio::{AudioClip, AudioSinkRef, MicrophoneRef};
use reflect_events::{event_names, CompletionStatus, SessionUpdate, Telemetry};
use reflect_llm::{
    synthesize_with_retry, ChatApiRef, ChatSession, LlmError, RetryPolicy, SpeechSynthesizerRef,
};
use reflect_transcript::{ConversationTurn, Transcript};
use serde_json::json;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::close_signal::contains_close_signal;
use crate::config::AssessmentConfig;
use crate::constants::{FALLBACK_EXIT_USER_TURNS, RECOGNIZER_LOCALE};
use crate::notice::{SessionNotice, SessionSnapshot};
use crate::recognizer::{
    ErrorSeverity, RecognitionErrorCode, RecognizerError, RecognizerEvent, RecognizerRef,
    MIC_BLOCKED_MESSAGE, NETWORK_ERROR_MESSAGE, UNSUPPORTED_MESSAGE,
};
use crate::voice::{
    ClipSequencer, PlaybackQueue, SentenceSegmenter, TranscriptAggregator, VoiceStatus,
};

pub const MIC_UNAVAILABLE_MESSAGE: &str = "Microphone access needed for visualizer.";
pub const CHAT_UNAVAILABLE_MESSAGE: &str = "Could not start a conversation with the model.";

/// External collaborators of a session.
#[derive(Clone)]
pub struct SessionDeps {
    pub chat: ChatApiRef,
    pub synthesizer: SpeechSynthesizerRef,
    pub sink: AudioSinkRef,
    pub recognizer: RecognizerRef,
    pub microphone: MicrophoneRef,
    pub telemetry: Telemetry,
}

/// Requests from the front end.
#[derive(Debug)]
pub enum SessionCommand {
    SendText(String),
    ToggleVoice,
    /// Manual exit, honoured only once the fallback is available.
    FinishNow,
    Recognizer(RecognizerEvent),
    Snapshot(oneshot::Sender<SessionSnapshot>),
    Shutdown,
}

/// Results of work spawned by the controller.
pub(crate) enum Internal {
    ChatReady(Result<Arc<dyn ChatSession>, LlmError>),
    StreamOpened { turn_id: u64 },
    StreamChunk { turn_id: u64, text: String },
    StreamFinished { turn_id: u64 },
    StreamFailed { turn_id: u64, error: LlmError },
    SpeechReady {
        epoch: u64,
        seq: u64,
        clip: Option<AudioClip>,
    },
    PlaybackEnded {
        epoch: u64,
        result: reflect_audio::Result<()>,
    },
}

/// Which timer a deadline belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Deadline {
    Silence,
    Restart,
    SpeechGrace,
    Complete,
}

pub struct SessionController {
    config: AssessmentConfig,
    deps: SessionDeps,
    retry: RetryPolicy,
    internal_tx: mpsc::UnboundedSender<Internal>,
    notices: mpsc::UnboundedSender<SessionNotice>,

    transcript: Transcript,
    chat: Option<Arc<dyn ChatSession>>,
    stream_task: Option<JoinHandle<()>>,
    turn_id: u64,

    aggregator: TranscriptAggregator,
    segmenter: SentenceSegmenter,
    playback: PlaybackQueue<AudioClip>,
    sequencer: ClipSequencer<AudioClip>,
    playing: Option<CancellationToken>,

    voice_mode: bool,
    status: VoiceStatus,
    loading: bool,
    banner: Option<String>,
    transitioning: bool,
    completed: bool,

    restart_at: Option<Instant>,
    grace_at: Option<Instant>,
    complete_at: Option<Instant>,
}

impl SessionController {
    pub(crate) fn new(
        config: AssessmentConfig,
        deps: SessionDeps,
        internal_tx: mpsc::UnboundedSender<Internal>,
        notices: mpsc::UnboundedSender<SessionNotice>,
    ) -> Self {
        let timings = config.voice;
        Self {
            transcript: Transcript::with_greeting(config.initial_greeting.clone()),
            aggregator: TranscriptAggregator::new(
                timings.final_debounce(),
                timings.interim_debounce(),
            ),
            config,
            deps,
            retry: RetryPolicy::default(),
            internal_tx,
            notices,
            chat: None,
            stream_task: None,
            turn_id: 0,
            segmenter: SentenceSegmenter::new(),
            playback: PlaybackQueue::new(),
            sequencer: ClipSequencer::new(),
            playing: None,
            voice_mode: false,
            status: VoiceStatus::Idle,
            loading: false,
            banner: None,
            transitioning: false,
            completed: false,
            restart_at: None,
            grace_at: None,
            complete_at: None,
        }
    }

    /// Publish the greeting, record the session and open the chat session.
    pub(crate) fn start(&mut self) {
        if let Some(greeting) = self.transcript.last().cloned() {
            self.notify(SessionNotice::TurnAppended {
                index: 0,
                turn: greeting,
            });
        }
        self.deps.telemetry.init_session();

        let chat_api = Arc::clone(&self.deps.chat);
        let chat_config = self.config.chat_config();
        let tx = self.internal_tx.clone();
        tokio::spawn(async move {
            let result = chat_api.create_session(&chat_config).await;
            let _ = tx.send(Internal::ChatReady(result));
        });
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.deps.telemetry.session_id().to_string(),
            turns: self.transcript.turns().to_vec(),
            status: self.status,
            voice_mode: self.voice_mode,
            loading: self.loading,
            transitioning: self.transitioning,
            completed: self.completed,
            input_preview: self.aggregator.preview().to_string(),
            banner: self.banner.clone(),
            fallback_available: self.fallback_available(),
        }
    }

    /// Enough user turns and the model has had the last word.
    pub fn fallback_available(&self) -> bool {
        self.transcript.user_turn_count() >= FALLBACK_EXIT_USER_TURNS
            && self
                .transcript
                .last()
                .map(ConversationTurn::is_finalized_model)
                .unwrap_or(false)
    }

    // --- Event dispatch ---

    pub(crate) fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::SendText(text) => self.send(&text),
            SessionCommand::ToggleVoice => {
                if self.voice_mode {
                    self.voice_off();
                } else {
                    self.voice_on();
                }
            }
            SessionCommand::FinishNow => self.finish_now(),
            SessionCommand::Recognizer(event) => self.on_recognizer(event),
            SessionCommand::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
            SessionCommand::Shutdown => self.shutdown(),
        }
    }

    pub(crate) fn handle_internal(&mut self, event: Internal) {
        match event {
            Internal::ChatReady(Ok(chat)) => {
                tracing::debug!("Chat session ready");
                self.chat = Some(chat);
            }
            Internal::ChatReady(Err(e)) => {
                tracing::error!("Failed to create chat session: {}", e);
                self.set_banner(Some(CHAT_UNAVAILABLE_MESSAGE.to_string()));
            }
            Internal::StreamOpened { turn_id } => self.on_stream_opened(turn_id),
            Internal::StreamChunk { turn_id, text } => self.on_stream_chunk(turn_id, &text),
            Internal::StreamFinished { turn_id } => self.on_stream_finished(turn_id),
            Internal::StreamFailed { turn_id, error } => self.on_stream_failed(turn_id, error),
            Internal::SpeechReady { epoch, seq, clip } => self.on_speech_ready(epoch, seq, clip),
            Internal::PlaybackEnded { epoch, result } => self.on_playback_ended(epoch, result),
        }
    }

    /// Earliest pending deadline, if any.
    pub(crate) fn next_deadline(&self) -> Option<(Instant, Deadline)> {
        [
            (self.aggregator.deadline(), Deadline::Silence),
            (self.restart_at, Deadline::Restart),
            (self.grace_at, Deadline::SpeechGrace),
            (self.complete_at, Deadline::Complete),
        ]
        .into_iter()
        .filter_map(|(at, kind)| at.map(|at| (at, kind)))
        .min_by_key(|(at, _)| *at)
    }

    pub(crate) fn on_deadline(&mut self, deadline: Deadline) {
        let now = Instant::now();
        match deadline {
            Deadline::Silence => {
                let Some(utterance) = self.aggregator.take_expired(now) else {
                    return;
                };
                if self.loading {
                    // Keep the speech so the next result extends it.
                    tracing::warn!(
                        len = utterance.len(),
                        "Reply still streaming, holding utterance"
                    );
                    self.aggregator.hold(&utterance);
                    self.notify(SessionNotice::InputPreview(utterance));
                } else {
                    tracing::debug!(len = utterance.len(), "Silence detected, submitting");
                    self.notify(SessionNotice::InputPreview(String::new()));
                    self.send(&utterance);
                }
            }
            Deadline::Restart => {
                self.restart_at = None;
                self.restart_recognizer();
            }
            Deadline::SpeechGrace => {
                self.grace_at = None;
                if self.status == VoiceStatus::Speaking && self.voice_pipeline_drained() {
                    self.finish_speaking();
                }
            }
            Deadline::Complete => self.complete(),
        }
    }

    // --- Conversation ---

    fn send(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        let Some(chat) = self.chat.clone() else {
            tracing::debug!("No chat session yet, ignoring send");
            return;
        };
        if self.transitioning || self.completed {
            tracing::debug!("Session is closing, ignoring send");
            return;
        }
        if self.loading {
            tracing::warn!("Reply still streaming, ignoring send");
            return;
        }

        self.aggregator.reset();
        self.notify(SessionNotice::InputPreview(String::new()));
        self.set_loading(true);
        self.segmenter.reset();
        self.clear_playback();

        if self.voice_mode {
            self.set_status(VoiceStatus::Processing);
            self.stop_listening();
        }

        self.push_turn(ConversationTurn::user(text));
        self.deps.telemetry.track(
            event_names::MESSAGE_SENT,
            Some(json!({
                "message_count": self.transcript.len(),
                "text_length": text.chars().count(),
            })),
        );

        self.turn_id += 1;
        let turn_id = self.turn_id;
        let tx = self.internal_tx.clone();
        let message = text.to_string();
        tracing::info!(turn_id, "Sending message");

        self.stream_task = Some(tokio::spawn(async move {
            let mut stream = match chat.send_stream(&message).await {
                Ok(stream) => stream,
                Err(error) => {
                    let _ = tx.send(Internal::StreamFailed { turn_id, error });
                    return;
                }
            };
            let _ = tx.send(Internal::StreamOpened { turn_id });

            while let Some(item) = stream.next().await {
                match item {
                    Ok(chunk) => {
                        let _ = tx.send(Internal::StreamChunk {
                            turn_id,
                            text: chunk.text,
                        });
                    }
                    Err(error) => {
                        let _ = tx.send(Internal::StreamFailed { turn_id, error });
                        return;
                    }
                }
            }
            let _ = tx.send(Internal::StreamFinished { turn_id });
        }));
    }

    fn on_stream_opened(&mut self, turn_id: u64) {
        if turn_id != self.turn_id {
            return;
        }
        self.push_turn(ConversationTurn::streaming_model());
    }

    fn on_stream_chunk(&mut self, turn_id: u64, text: &str) {
        if turn_id != self.turn_id || text.is_empty() {
            return;
        }
        let Some(turn) = self.transcript.streaming_turn_mut() else {
            return;
        };
        turn.text.push_str(text);
        let full = turn.text.clone();
        self.notify(SessionNotice::TurnUpdated {
            index: self.transcript.len() - 1,
            text: full,
            is_streaming: true,
        });

        if self.voice_mode {
            for unit in self.segmenter.push(text) {
                self.dispatch_speech(unit);
            }
        }
    }

    fn on_stream_finished(&mut self, turn_id: u64) {
        if turn_id != self.turn_id {
            return;
        }
        self.stream_task = None;
        let reply = self.finalize_streaming_turn().unwrap_or_default();

        if self.voice_mode {
            if let Some(unit) = self.segmenter.flush() {
                self.dispatch_speech(unit);
            }
        }

        self.set_loading(false);
        self.deps.telemetry.track(
            event_names::AI_RESPONDED,
            Some(json!({ "text_length": reply.chars().count() })),
        );

        if contains_close_signal(&reply) {
            self.begin_transition();
        } else {
            self.settle_voice();
        }
    }

    fn on_stream_failed(&mut self, turn_id: u64, error: LlmError) {
        if turn_id != self.turn_id {
            return;
        }
        tracing::error!(turn_id, "Chat stream failed: {}", error);
        self.stream_task = None;

        let index = self.transcript.len() - 1;
        if self.transcript.discard_empty_streaming_turn() {
            self.notify(SessionNotice::TurnRemoved { index });
        } else {
            self.finalize_streaming_turn();
        }

        self.set_loading(false);
        self.settle_voice();
    }

    /// Clear the streaming flag on the last turn and return its text.
    fn finalize_streaming_turn(&mut self) -> Option<String> {
        let turn = self.transcript.streaming_turn_mut()?;
        turn.is_streaming = false;
        let text = turn.text.clone();
        self.notify(SessionNotice::TurnUpdated {
            index: self.transcript.len() - 1,
            text: text.clone(),
            is_streaming: false,
        });
        Some(text)
    }

    fn begin_transition(&mut self) {
        tracing::info!("Close signal detected, preparing results");
        self.transitioning = true;
        self.notify(SessionNotice::Transitioning);
        self.deps.telemetry.track(
            event_names::ASSESSMENT_COMPLETE,
            Some(json!({ "message_count": self.transcript.len() })),
        );

        self.stop_listening();
        self.clear_playback();
        self.set_status(VoiceStatus::Idle);
        self.complete_at = Some(Instant::now() + self.config.voice.close_transition());
    }

    fn finish_now(&mut self) {
        if self.transitioning || self.completed {
            return;
        }
        if !self.fallback_available() {
            tracing::debug!("Finish requested before fallback is available");
            return;
        }
        self.complete();
    }

    fn complete(&mut self) {
        if self.completed {
            return;
        }
        self.completed = true;
        self.complete_at = None;
        self.teardown();

        self.deps.telemetry.update_session(SessionUpdate {
            completion_status: Some(CompletionStatus::Completed),
            message_count: Some(self.transcript.len()),
            ..Default::default()
        });
        tracing::info!(turns = self.transcript.len(), "Session complete");
        self.notify(SessionNotice::Completed(self.transcript.turns().to_vec()));
    }

    pub(crate) fn shutdown(&mut self) {
        if self.completed {
            return;
        }
        self.deps.telemetry.update_session(SessionUpdate {
            completion_status: Some(CompletionStatus::Abandoned),
            message_count: Some(self.transcript.len()),
            ..Default::default()
        });
        self.teardown();
    }

    /// Stop every timer and collaborator the session still holds.
    fn teardown(&mut self) {
        self.aggregator.reset();
        self.stop_listening();
        self.clear_playback();
        self.grace_at = None;
        self.restart_at = None;
        self.deps.microphone.release();
        if self.voice_mode {
            self.voice_mode = false;
            self.notify(SessionNotice::VoiceModeChanged(false));
        }
        self.set_status(VoiceStatus::Idle);
        if let Some(task) = self.stream_task.take() {
            task.abort();
        }
    }

    // --- Voice mode ---

    fn voice_on(&mut self) {
        if self.transitioning || self.completed {
            return;
        }
        self.voice_mode = true;
        self.notify(SessionNotice::VoiceModeChanged(true));

        if let Err(e) = self.deps.microphone.acquire() {
            tracing::warn!("Microphone unavailable: {}", e);
            self.set_banner(Some(MIC_UNAVAILABLE_MESSAGE.to_string()));
        }

        let last = self
            .transcript
            .last()
            .filter(|turn| turn.is_finalized_model() && !turn.text.trim().is_empty())
            .map(|turn| turn.text.clone());
        match last {
            Some(text) => {
                self.clear_playback();
                self.dispatch_speech(text);
            }
            None => self.start_listening(),
        }
    }

    fn voice_off(&mut self) {
        self.voice_mode = false;
        self.notify(SessionNotice::VoiceModeChanged(false));
        self.set_status(VoiceStatus::Idle);
        self.stop_listening();
        self.deps.microphone.release();
        self.clear_playback();
    }

    fn start_listening(&mut self) {
        if !self.voice_mode || self.transitioning || self.completed {
            return;
        }
        if self.status == VoiceStatus::Listening {
            return;
        }
        self.start_recognizer();
    }

    fn restart_recognizer(&mut self) {
        if !self.voice_mode || self.transitioning || self.completed {
            return;
        }
        if matches!(self.status, VoiceStatus::Speaking | VoiceStatus::Processing) {
            return;
        }
        tracing::debug!("Restarting recognizer");
        self.start_recognizer();
    }

    fn start_recognizer(&mut self) {
        match self.deps.recognizer.start(RECOGNIZER_LOCALE) {
            Ok(()) | Err(RecognizerError::AlreadyStarted) => {
                self.set_status(VoiceStatus::Listening);
            }
            Err(RecognizerError::Unsupported) => {
                tracing::warn!("Speech recognition not supported");
                self.set_banner(Some(UNSUPPORTED_MESSAGE.to_string()));
                self.voice_off();
            }
        }
    }

    /// Abort the recognizer and drop the silence and restart deadlines.
    fn stop_listening(&mut self) {
        self.deps.recognizer.abort();
        self.aggregator.cancel();
        self.restart_at = None;
    }

    fn on_recognizer(&mut self, event: RecognizerEvent) {
        match &event {
            RecognizerEvent::Started => {
                if !self.voice_mode {
                    return;
                }
                if matches!(self.status, VoiceStatus::Idle | VoiceStatus::Listening) {
                    self.set_status(VoiceStatus::Listening);
                }
                self.set_banner(None);
            }
            RecognizerEvent::Result { .. } => {
                if !self.voice_mode || self.transitioning {
                    return;
                }
                if self.status != VoiceStatus::Listening {
                    tracing::debug!(status = %self.status, "Ignoring late recognizer result");
                    return;
                }
                let Some((interim, final_text)) = event.split() else {
                    return;
                };
                if self
                    .aggregator
                    .on_result(&interim, &final_text, Instant::now())
                {
                    let preview = self.aggregator.preview().to_string();
                    self.notify(SessionNotice::InputPreview(preview));
                }
            }
            RecognizerEvent::Ended => {
                if !self.voice_mode || self.transitioning || self.completed {
                    return;
                }
                if matches!(self.status, VoiceStatus::Speaking | VoiceStatus::Processing) {
                    return;
                }
                self.restart_at = Some(Instant::now() + self.config.voice.restart_delay());
            }
            RecognizerEvent::Error(code) => self.on_recognizer_error(code.clone()),
        }
    }

    fn on_recognizer_error(&mut self, code: Option<RecognitionErrorCode>) {
        let Some(code) = code else { return };
        match code.severity() {
            ErrorSeverity::Ignored => {}
            ErrorSeverity::Fatal => {
                tracing::error!(?code, "Microphone not allowed");
                self.set_banner(Some(MIC_BLOCKED_MESSAGE.to_string()));
                if self.voice_mode {
                    self.voice_off();
                }
            }
            ErrorSeverity::Surfaced => {
                tracing::warn!(?code, "Recognizer network error");
                self.set_banner(Some(NETWORK_ERROR_MESSAGE.to_string()));
            }
            ErrorSeverity::Logged => {
                tracing::warn!(?code, "Recognizer error");
            }
        }
    }

    // --- Speech output ---

    fn dispatch_speech(&mut self, text: String) {
        let seq = self.sequencer.reserve();
        let epoch = self.playback.epoch();
        let synth = Arc::clone(&self.deps.synthesizer);
        let retry = self.retry;
        let tx = self.internal_tx.clone();
        tracing::debug!(seq, epoch, chars = text.len(), "Dispatching sentence");

        tokio::spawn(async move {
            let audio = synthesize_with_retry(synth.as_ref(), &text, retry).await;
            let clip = if audio.is_empty() {
                None
            } else {
                match AudioClip::from_base64_pcm(&audio) {
                    Ok(clip) => Some(clip),
                    Err(e) => {
                        tracing::warn!(seq, "Discarding undecodable speech: {}", e);
                        None
                    }
                }
            };
            let _ = tx.send(Internal::SpeechReady { epoch, seq, clip });
        });
    }

    fn on_speech_ready(&mut self, epoch: u64, seq: u64, clip: Option<AudioClip>) {
        if epoch != self.playback.epoch() {
            tracing::debug!(epoch, seq, "Dropping stale speech");
            return;
        }
        for clip in self.sequencer.resolve(seq, clip) {
            self.playback.enqueue(clip);
        }
        self.play_next();
        self.settle_voice();
    }

    fn play_next(&mut self) {
        let Some(clip) = self.playback.start_next() else {
            return;
        };
        self.grace_at = None;
        if self.status == VoiceStatus::Listening {
            self.stop_listening();
        }
        self.set_status(VoiceStatus::Speaking);

        let token = CancellationToken::new();
        self.playing = Some(token.clone());
        let epoch = self.playback.epoch();
        let sink = Arc::clone(&self.deps.sink);
        let tx = self.internal_tx.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                result = sink.play(&clip) => {
                    let _ = tx.send(Internal::PlaybackEnded { epoch, result });
                }
            }
        });
    }

    fn on_playback_ended(&mut self, epoch: u64, result: reflect_audio::Result<()>) {
        if !self.playback.finish(epoch) {
            return;
        }
        self.playing = None;
        if let Err(e) = result {
            tracing::warn!("Playback failed, skipping clip: {}", e);
        }
        self.play_next();
        self.settle_voice();
    }

    /// Stop in-flight playback, drop queued audio and outstanding synthesis.
    fn clear_playback(&mut self) {
        self.playback.clear();
        self.sequencer.reset();
        if let Some(token) = self.playing.take() {
            token.cancel();
        }
        self.grace_at = None;
    }

    /// Nothing playing, queued, being synthesized or still streaming.
    fn voice_pipeline_drained(&self) -> bool {
        self.playback.is_idle() && self.sequencer.outstanding() == 0 && !self.loading
    }

    /// Move the voice loop forward once the pipeline has drained.
    fn settle_voice(&mut self) {
        if !self.voice_pipeline_drained() {
            return;
        }
        match self.status {
            VoiceStatus::Speaking => {
                if self.grace_at.is_none() {
                    self.grace_at = Some(Instant::now() + self.config.voice.speech_end_grace());
                }
            }
            VoiceStatus::Processing | VoiceStatus::Idle => self.start_listening(),
            VoiceStatus::Listening => {}
        }
    }

    fn finish_speaking(&mut self) {
        if self.voice_mode && !self.transitioning {
            self.start_listening();
        } else {
            self.set_status(VoiceStatus::Idle);
        }
    }

    // --- State helpers ---

    fn push_turn(&mut self, turn: ConversationTurn) {
        self.transcript.push(turn.clone());
        self.notify(SessionNotice::TurnAppended {
            index: self.transcript.len() - 1,
            turn,
        });
    }

    fn set_status(&mut self, status: VoiceStatus) {
        if self.status == status {
            return;
        }
        tracing::debug!(from = %self.status, to = %status, "Voice status");
        self.status = status;
        self.notify(SessionNotice::StatusChanged(status));
    }

    fn set_loading(&mut self, loading: bool) {
        if self.loading != loading {
            self.loading = loading;
            self.notify(SessionNotice::Loading(loading));
        }
    }

    fn set_banner(&mut self, banner: Option<String>) {
        if self.banner != banner {
            self.banner = banner.clone();
            self.notify(SessionNotice::Banner(banner));
        }
    }

    fn notify(&self, notice: SessionNotice) {
        let _ = self.notices.send(notice);
    }
}
