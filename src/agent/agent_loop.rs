//! Main agent loop.
//!
//! One MAPE cycle per iteration: trim the transcript, prompt the model,
//! parse its reply, dispatch the chosen action and record the observation.

use std::sync::Arc;

use crate::agent::{Action, Scratchpad, TranscriptEntry, build_prompt, parse_response};
use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::escalation::Escalation;
use crate::llm::LlmProvider;
use crate::terminal::{SESSION_ENDED, TerminalHandle};

/// Where the agent is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Running,
    AwaitingModel,
    Dispatching,
    /// The model declared the goal reached, or the session ended.
    Done,
    /// The step budget ran out.
    Budgeted,
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub final_state: AgentState,
    /// Model calls made.
    pub cycles: usize,
    /// Actions actually dispatched.
    pub dispatched: usize,
}

/// Core dependencies for the agent.
pub struct AgentDeps {
    pub llm: Arc<dyn LlmProvider>,
    pub escalation: Arc<dyn Escalation>,
}

/// The terminal-operating agent.
pub struct Agent<'a> {
    config: AgentConfig,
    deps: AgentDeps,
    terminal: &'a TerminalHandle,
    scratchpad: Scratchpad,
    state: AgentState,
}

impl<'a> Agent<'a> {
    /// Create a new agent working in `terminal`.
    pub fn new(config: AgentConfig, deps: AgentDeps, terminal: &'a TerminalHandle) -> Self {
        Self {
            config,
            deps,
            terminal,
            scratchpad: Scratchpad::new(),
            state: AgentState::Running,
        }
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    /// The transcript as of the last cycle.
    pub fn scratchpad(&self) -> &Scratchpad {
        &self.scratchpad
    }

    /// Work toward `goal` until done, out of budget, or a fatal error.
    pub async fn run(&mut self, goal: &str) -> Result<RunSummary, AgentError> {
        tracing::info!("Starting agent with model {}", self.deps.llm.model_name());
        tracing::info!("Goal: {}", goal);

        self.state = AgentState::Running;
        self.scratchpad = Scratchpad::new();

        let screen = self.terminal.read(self.terminal.read_max_lines()).await;
        let session_gone = screen == SESSION_ENDED;
        self.scratchpad
            .push(TranscriptEntry::monitor(Action::TerminalRun.name(), screen));

        let mut summary = RunSummary {
            final_state: AgentState::Running,
            cycles: 0,
            dispatched: 0,
        };

        if session_gone {
            tracing::warn!("Terminal session is gone before the first step");
            self.state = AgentState::Done;
            summary.final_state = AgentState::Done;
            return Ok(summary);
        }

        loop {
            if summary.cycles >= self.config.max_steps {
                tracing::warn!("Step budget of {} exhausted", self.config.max_steps);
                self.state = AgentState::Budgeted;
                break;
            }

            let include_example = summary.cycles < self.config.example_cycles;
            let finished = self.cycle(goal, include_example, &mut summary).await?;
            summary.cycles += 1;

            if finished {
                self.state = AgentState::Done;
                break;
            }
            self.state = AgentState::Running;
        }

        summary.final_state = self.state;
        tracing::info!(
            "Agent stopped in {:?} after {} cycles ({} actions)",
            summary.final_state,
            summary.cycles,
            summary.dispatched
        );
        Ok(summary)
    }

    /// Run one cycle. Returns `true` when the run should stop.
    async fn cycle(
        &mut self,
        goal: &str,
        include_example: bool,
        summary: &mut RunSummary,
    ) -> Result<bool, AgentError> {
        self.scratchpad = self.scratchpad.shrink(self.config.max_scratchpad_rounds);

        let prompt = build_prompt(goal, &self.scratchpad, include_example);
        tracing::debug!("Prompt:\n{}", prompt);

        self.state = AgentState::AwaitingModel;
        let raw = self.deps.llm.predict(&prompt).await?;
        tracing::debug!("Model reply:\n{}", raw);

        let step = parse_response(&raw)?;
        if !step.analysis.is_empty() {
            tracing::info!("{}", step.analysis);
        }
        if !step.plan.is_empty() {
            tracing::info!("{}", step.plan);
        }

        let (label, observation) = if step.is_done || step.action_name.is_empty() {
            (String::new(), String::new())
        } else {
            let action: Action = step.action_name.parse()?;
            self.state = AgentState::Dispatching;
            tokio::time::sleep(self.config.dispatch_delay).await;

            tracing::info!("Dispatching {}[{}]", action, step.action_input);
            let observation = self.dispatch(action, &step.action_input).await?;
            summary.dispatched += 1;
            (action.observation_label().to_string(), observation)
        };

        self.scratchpad
            .push(TranscriptEntry::step(step.analysis, step.plan, step.execute));

        if step.is_done {
            tracing::info!("Model reports the goal is reached");
            return Ok(true);
        }

        let session_gone = observation == SESSION_ENDED;
        tracing::debug!("Observation ({}): {}", label, observation);
        self.scratchpad
            .push(TranscriptEntry::monitor(label, observation));

        if session_gone {
            tracing::warn!("Terminal session ended, stopping");
        }
        Ok(session_gone)
    }

    async fn dispatch(&self, action: Action, input: &str) -> Result<String, AgentError> {
        match action {
            Action::TerminalRun => Ok(self.terminal.run_and_read(input).await),
            Action::TerminalRead => {
                let max_lines = input
                    .trim()
                    .parse::<usize>()
                    .unwrap_or_else(|_| self.terminal.read_max_lines());
                Ok(self.terminal.read(max_lines).await)
            }
            Action::Ask => Ok(self.deps.escalation.ask(input).await?),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::config::TerminalConfig;
    use crate::error::{EscalationError, LlmError};
    use crate::terminal::{ScriptedBackend, Snapshot};

    const DONE: &str = "A: done\nP: end\nE: end";
    const PROMPT: &str = "ubuntu@host:~$";

    /// Replies from a queue; repeats the last reply once the queue is empty.
    struct ScriptedLlm {
        replies: Mutex<VecDeque<String>>,
        last: Mutex<String>,
        calls: AtomicUsize,
    }

    impl ScriptedLlm {
        fn new(replies: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
                last: Mutex::new(DONE.to_string()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        fn model_name(&self) -> &str {
            "scripted"
        }

        async fn predict(&self, _prompt: &str) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut last = self.last.lock().unwrap();
            if let Some(reply) = self.replies.lock().unwrap().pop_front() {
                *last = reply;
            }
            Ok(last.clone())
        }
    }

    struct FixedReply {
        reply: String,
        questions: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Escalation for FixedReply {
        async fn ask(&self, question: &str) -> Result<String, EscalationError> {
            self.questions.lock().unwrap().push(question.to_string());
            Ok(self.reply.clone())
        }
    }

    fn fixed_reply(reply: &str) -> Arc<FixedReply> {
        Arc::new(FixedReply {
            reply: reply.to_string(),
            questions: Mutex::new(Vec::new()),
        })
    }

    fn agent_config(max_steps: usize) -> AgentConfig {
        AgentConfig {
            max_steps,
            dispatch_delay: Duration::ZERO,
            ..AgentConfig::default()
        }
    }

    fn deps(llm: Arc<ScriptedLlm>, escalation: Arc<FixedReply>) -> AgentDeps {
        AgentDeps { llm, escalation }
    }

    #[tokio::test]
    async fn test_done_after_one_cycle() {
        let backend = ScriptedBackend::idle(&[PROMPT]);
        let sent = backend.sent_log();
        let terminal = TerminalHandle::spawn(backend, &TerminalConfig::immediate()).unwrap();
        let llm = ScriptedLlm::new(&[DONE]);

        let mut agent = Agent::new(agent_config(10), deps(llm.clone(), fixed_reply("")), &terminal);
        let summary = agent.run("check the prompt").await.unwrap();

        assert_eq!(
            summary,
            RunSummary {
                final_state: AgentState::Done,
                cycles: 1,
                dispatched: 0,
            }
        );
        assert_eq!(llm.calls(), 1);
        assert!(sent.lock().unwrap().is_empty());
        assert_eq!(
            agent.scratchpad().entries(),
            &[
                TranscriptEntry::monitor("terminal_run", format!("\n{PROMPT}")),
                TranscriptEntry::step("A: done", "P: end", "E: end"),
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_action_aborts() {
        let terminal =
            TerminalHandle::spawn(ScriptedBackend::idle(&[PROMPT]), &TerminalConfig::immediate())
                .unwrap();
        let llm = ScriptedLlm::new(&["A: x\nP: wipe -> end\nE: rm_rf[/]"]);

        let mut agent = Agent::new(agent_config(10), deps(llm.clone(), fixed_reply("")), &terminal);
        let err = agent.run("anything").await.unwrap_err();

        assert!(matches!(err, AgentError::UnknownAction(ref name) if name == "rm_rf"));
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_malformed_reply_aborts() {
        let terminal =
            TerminalHandle::spawn(ScriptedBackend::idle(&[PROMPT]), &TerminalConfig::immediate())
                .unwrap();
        let llm = ScriptedLlm::new(&["A: x\nP: install vim -> end"]);

        let mut agent = Agent::new(agent_config(10), deps(llm, fixed_reply("")), &terminal);
        let err = agent.run("install vim").await.unwrap_err();

        assert!(matches!(err, AgentError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn test_budget_exhausted() {
        let terminal =
            TerminalHandle::spawn(ScriptedBackend::idle(&[PROMPT]), &TerminalConfig::immediate())
                .unwrap();
        let llm = ScriptedLlm::new(&["A: look\nP: read -> end\nE: terminal_read[5]"]);

        let mut agent = Agent::new(agent_config(3), deps(llm.clone(), fixed_reply("")), &terminal);
        let summary = agent.run("stare at the screen").await.unwrap();

        assert_eq!(summary.final_state, AgentState::Budgeted);
        assert_eq!(summary.cycles, 3);
        assert_eq!(summary.dispatched, 3);
        assert_eq!(llm.calls(), 3);
        assert_eq!(agent.state(), AgentState::Budgeted);
    }

    #[tokio::test]
    async fn test_terminal_run_records_output() {
        let backend = ScriptedBackend::idle(&[PROMPT]).on_input(
            "ls",
            vec![Snapshot::from_lines([
                "ubuntu@host:~$ ls",
                "a.txt b.txt",
                PROMPT,
            ])],
        );
        let sent = backend.sent_log();
        let terminal = TerminalHandle::spawn(backend, &TerminalConfig::immediate()).unwrap();
        let llm = ScriptedLlm::new(&["A: look around\nP: list files -> end\nE: terminal_run[ls]", DONE]);

        let mut agent = Agent::new(agent_config(10), deps(llm, fixed_reply("")), &terminal);
        let summary = agent.run("list files").await.unwrap();

        assert_eq!(summary.final_state, AgentState::Done);
        assert_eq!(summary.cycles, 2);
        assert_eq!(summary.dispatched, 1);
        assert_eq!(*sent.lock().unwrap(), vec!["ls\n".to_string()]);
        assert!(agent.scratchpad().entries().contains(&TranscriptEntry::monitor(
            "terminal_run",
            "\n\ta.txt b.txt\n\tubuntu@host:~$"
        )));
    }

    #[tokio::test]
    async fn test_ask_reply_is_labelled() {
        let terminal =
            TerminalHandle::spawn(ScriptedBackend::idle(&[PROMPT]), &TerminalConfig::immediate())
                .unwrap();
        let llm = ScriptedLlm::new(&["A: need it\nP: ask -> end\nE: ask[what is the password?]", DONE]);
        let escalation = fixed_reply("s3cret");

        let mut agent = Agent::new(agent_config(10), deps(llm, escalation.clone()), &terminal);
        let summary = agent.run("log in").await.unwrap();

        assert_eq!(summary.dispatched, 1);
        assert_eq!(
            *escalation.questions.lock().unwrap(),
            vec!["what is the password?".to_string()]
        );
        assert!(
            agent
                .scratchpad()
                .entries()
                .contains(&TranscriptEntry::monitor("ask reply", "s3cret"))
        );
    }

    #[tokio::test]
    async fn test_session_end_stops_run() {
        let screen = Snapshot::from_lines([PROMPT]);
        let backend = ScriptedBackend::new([screen.clone(), screen]).ending_session();
        let terminal = TerminalHandle::spawn(backend, &TerminalConfig::immediate()).unwrap();
        let llm = ScriptedLlm::new(&["A: leave\nP: exit shell -> check\nE: terminal_run[exit]"]);

        let mut agent = Agent::new(agent_config(10), deps(llm.clone(), fixed_reply("")), &terminal);
        let summary = agent.run("log out").await.unwrap();

        assert_eq!(summary.final_state, AgentState::Done);
        assert_eq!(summary.cycles, 1);
        assert_eq!(llm.calls(), 1);
        assert!(
            agent
                .scratchpad()
                .entries()
                .contains(&TranscriptEntry::monitor("terminal_run", SESSION_ENDED))
        );
    }

    #[tokio::test]
    async fn test_empty_action_is_noop() {
        let terminal =
            TerminalHandle::spawn(ScriptedBackend::idle(&[PROMPT]), &TerminalConfig::immediate())
                .unwrap();
        let llm = ScriptedLlm::new(&["A: thinking\nP: wait -> end\nE:", DONE]);

        let mut agent = Agent::new(agent_config(10), deps(llm, fixed_reply("")), &terminal);
        let summary = agent.run("wait").await.unwrap();

        assert_eq!(summary.cycles, 2);
        assert_eq!(summary.dispatched, 0);
        assert!(
            agent
                .scratchpad()
                .entries()
                .contains(&TranscriptEntry::monitor("", ""))
        );
    }
}
