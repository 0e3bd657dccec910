use super::{append_runtime_log, StatePaths};
use crate::channels::slack::{
    gather_context, post_reply, strip_bot_mention, ContextQuery, ContextSource, InboundEvent,
    MentionEvent, ReplyPoster, SlashCommand,
};
use crate::orchestration::{
    format_search_conditions, plan_hangout, respond_mention, PipelineOptions, PipelineResult,
};
use crate::provider::PromptRunner;
use serde_json::json;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Everything one inbound request needs. Shared read-only across the
/// per-request worker threads.
pub struct RequestHandler<S, P, R> {
    pub context_source: Option<S>,
    pub poster: P,
    pub runner: R,
    pub paths: StatePaths,
    pub options: PipelineOptions,
}

impl<S, P, R> RequestHandler<S, P, R>
where
    S: ContextSource + Sync,
    P: ReplyPoster,
    R: PromptRunner,
{
    pub fn handle(&self, event: InboundEvent) {
        match event {
            InboundEvent::Command(command) => self.handle_command(&command),
            InboundEvent::Mention(mention) => self.handle_mention(&mention),
        }
    }

    pub fn handle_command(&self, command: &SlashCommand) {
        if command.command.trim() != self.options.command_name {
            return;
        }
        append_runtime_log(
            &self.paths,
            "info",
            "request.received",
            json!({
                "kind": "command",
                "channel": command.channel_id,
                "user": command.user_id,
            }),
        );

        let ack = format!(
            "🤔 <@{}> Working on it...\n{}",
            command.user_id,
            format_search_conditions(&command.text)
        );
        self.reply(&command.channel_id, None, &ack);

        let query = ContextQuery {
            channel_id: command.channel_id.clone(),
            user_id: non_empty(&command.user_id),
            thread_ts: None,
        };
        let context = gather_context(self.context_source.as_ref(), &query);
        let result = plan_hangout(&self.runner, &command.text, context.as_ref(), &self.options);
        self.log_failure("hangout", &command.channel_id, &result);
        self.reply(&command.channel_id, None, &result.text);
    }

    pub fn handle_mention(&self, mention: &MentionEvent) {
        if mention.is_from_bot() {
            return;
        }
        append_runtime_log(
            &self.paths,
            "info",
            "request.received",
            json!({
                "kind": "mention",
                "channel": mention.channel,
                "user": mention.user,
            }),
        );

        let thread_ts = mention.reply_thread_ts();
        let text = strip_bot_mention(&mention.text);
        if text.is_empty() {
            let prompt = format!("<@{}> How can I help?", mention.user);
            self.reply(&mention.channel, Some(thread_ts), &prompt);
            return;
        }

        let query = ContextQuery {
            channel_id: mention.channel.clone(),
            user_id: non_empty(&mention.user),
            thread_ts: mention.thread_ts.as_deref().and_then(non_empty),
        };
        let context = gather_context(self.context_source.as_ref(), &query);
        let result = respond_mention(&self.runner, &text, context.as_ref(), &self.options);
        self.log_failure("mention", &mention.channel, &result);
        let reply = format!("<@{}> {}", mention.user, result.text);
        self.reply(&mention.channel, Some(thread_ts), &reply);
    }

    fn log_failure(&self, flow: &str, channel_id: &str, result: &PipelineResult) {
        let Some(report) = result.failure.as_ref() else {
            return;
        };
        let invocation = report.invocation.as_ref();
        append_runtime_log(
            &self.paths,
            "error",
            "pipeline.failed",
            json!({
                "flow": flow,
                "channel": channel_id,
                "diagnosis": report.diagnosis,
                "first_error": report.first_error,
                "second_error": report.second_error,
                "stdout": report.stdout,
                "stderr": report.stderr,
                "command": invocation.map(|log| log.command_form.as_str()),
                "working_directory": invocation.map(|log| log.working_directory.display().to_string()),
                "exit_code": invocation.and_then(|log| log.exit_code),
                "timed_out": invocation.map(|log| log.timed_out),
                "elapsed_ms": invocation.map(|log| log.elapsed_ms),
            }),
        );
    }

    fn reply(&self, channel_id: &str, thread_ts: Option<&str>, text: &str) {
        if let Err(err) = post_reply(&self.poster, channel_id, thread_ts, text) {
            append_runtime_log(
                &self.paths,
                "error",
                "reply.post_failed",
                json!({
                    "channel": channel_id,
                    "error": err.to_string(),
                }),
            );
        }
    }
}

/// Runs one event on its own worker thread.
pub fn spawn_handler<S, P, R>(
    handler: &Arc<RequestHandler<S, P, R>>,
    event: InboundEvent,
) -> JoinHandle<()>
where
    S: ContextSource + Send + Sync + 'static,
    P: ReplyPoster + Send + Sync + 'static,
    R: PromptRunner + Send + Sync + 'static,
{
    let handler = Arc::clone(handler);
    thread::spawn(move || handler.handle(event))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::slack::{SlackError, SlackMessage, SlackUser};
    use crate::provider::{ExecutionOutcome, InvocationLog, ProviderError};
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tempfile::tempdir;

    struct NoContext;

    impl ContextSource for NoContext {
        fn recent_messages(&self, _: &str, _: usize) -> Result<Vec<SlackMessage>, SlackError> {
            Err(SlackError::ApiResponse("not_in_channel".to_string()))
        }
        fn channel_members(&self, _: &str, _: usize) -> Result<Vec<String>, SlackError> {
            Ok(Vec::new())
        }
        fn user_profile(&self, _: &str) -> Result<SlackUser, SlackError> {
            Err(SlackError::ApiResponse("user_not_found".to_string()))
        }
        fn thread_replies(
            &self,
            _: &str,
            _: &str,
            _: usize,
        ) -> Result<Vec<SlackMessage>, SlackError> {
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    struct Outbox {
        posts: Mutex<Vec<(String, Option<String>, String)>>,
    }

    impl ReplyPoster for Outbox {
        fn post(
            &self,
            channel_id: &str,
            thread_ts: Option<&str>,
            text: &str,
        ) -> Result<(), SlackError> {
            self.posts.lock().expect("outbox lock").push((
                channel_id.to_string(),
                thread_ts.map(str::to_string),
                text.to_string(),
            ));
            Ok(())
        }
    }

    struct FixedRunner {
        stdout: String,
        prompts: Mutex<Vec<String>>,
    }

    impl PromptRunner for FixedRunner {
        fn run_prompt(&self, prompt: &str) -> Result<ExecutionOutcome, ProviderError> {
            self.prompts.lock().expect("prompts lock").push(prompt.to_string());
            Ok(ExecutionOutcome {
                stdout: self.stdout.clone(),
                stderr: String::new(),
                log: InvocationLog {
                    command_form: "codex exec --skip-git-repo-check <prompt>".to_string(),
                    working_directory: PathBuf::from("/srv/nomikai"),
                    exit_code: Some(0),
                    timed_out: false,
                    elapsed_ms: 42,
                },
            })
        }
    }

    fn handler(
        stdout: &str,
        state_root: &std::path::Path,
    ) -> RequestHandler<NoContext, Outbox, FixedRunner> {
        RequestHandler {
            context_source: Some(NoContext),
            poster: Outbox::default(),
            runner: FixedRunner {
                stdout: stdout.to_string(),
                prompts: Mutex::new(Vec::new()),
            },
            paths: StatePaths::new(state_root),
            options: PipelineOptions {
                verbose_diagnostics: false,
                command_name: "/nomikai".to_string(),
            },
        }
    }

    fn mention(text: &str, thread_ts: Option<&str>) -> MentionEvent {
        MentionEvent {
            text: text.to_string(),
            user: "U1".to_string(),
            channel: "C1".to_string(),
            ts: "100.1".to_string(),
            thread_ts: thread_ts.map(str::to_string),
            bot_id: None,
        }
    }

    #[test]
    fn empty_mention_asks_how_to_help_without_running_tool() {
        let tmp = tempdir().expect("tempdir");
        let handler = handler("unused", tmp.path());
        handler.handle_mention(&mention("<@UBOT>   ", None));

        let posts = handler.poster.posts.lock().expect("outbox lock");
        assert_eq!(
            posts.as_slice(),
            &[(
                "C1".to_string(),
                Some("100.1".to_string()),
                "<@U1> How can I help?".to_string()
            )]
        );
        assert!(handler.runner.prompts.lock().expect("prompts lock").is_empty());
    }

    #[test]
    fn mention_reply_goes_to_existing_thread() {
        let tmp = tempdir().expect("tempdir");
        let handler = handler("**Try** the pier", tmp.path());
        handler.handle_mention(&mention("<@UBOT> where tonight?", Some("99.0")));

        let posts = handler.poster.posts.lock().expect("outbox lock");
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].1.as_deref(), Some("99.0"));
        assert_eq!(posts[0].2, "<@U1> *Try* the pier");

        let prompts = handler.runner.prompts.lock().expect("prompts lock");
        assert!(prompts[0].contains("\"where tonight?\""));
        assert!(prompts[0].contains("not_in_channel"));
    }

    #[test]
    fn bot_mentions_are_ignored() {
        let tmp = tempdir().expect("tempdir");
        let handler = handler("unused", tmp.path());
        let mut event = mention("<@UBOT> hi", None);
        event.bot_id = Some("B1".to_string());
        handler.handle(InboundEvent::Mention(event));
        assert!(handler.poster.posts.lock().expect("outbox lock").is_empty());
    }

    #[test]
    fn other_slash_commands_are_ignored() {
        let tmp = tempdir().expect("tempdir");
        let handler = handler("unused", tmp.path());
        handler.handle_command(&SlashCommand {
            command: "/other".to_string(),
            text: "Downtown".to_string(),
            user_id: "U1".to_string(),
            channel_id: "C1".to_string(),
        });
        assert!(handler.poster.posts.lock().expect("outbox lock").is_empty());
    }

    #[test]
    fn failed_command_posts_ack_then_hint_and_logs_report() {
        let tmp = tempdir().expect("tempdir");
        let handler = handler("no json here", tmp.path());
        handler.handle_command(&SlashCommand {
            command: "/nomikai".to_string(),
            text: "Downtown 40 4 7:30pm".to_string(),
            user_id: "U1".to_string(),
            channel_id: "C1".to_string(),
        });

        let posts = handler.poster.posts.lock().expect("outbox lock");
        assert_eq!(posts.len(), 2);
        assert!(posts[0].2.starts_with("🤔 <@U1> Working on it...\n🔎 Search conditions:"));
        assert!(posts[1].2.starts_with("⚠️ Failed to generate suggestions."));
        assert_eq!(handler.runner.prompts.lock().expect("prompts lock").len(), 2);

        let log = std::fs::read_to_string(handler.paths.runtime_log_path()).expect("log");
        assert!(log.contains("\"event\":\"pipeline.failed\""));
        assert!(log.contains("\"flow\":\"hangout\""));
        assert!(log.contains("\"stdout\":\"no json here\""));

        let entry: serde_json::Value = log
            .lines()
            .filter_map(|line| serde_json::from_str::<serde_json::Value>(line).ok())
            .find(|entry| entry["event"] == "pipeline.failed")
            .expect("pipeline.failed entry");
        assert_eq!(entry["command"], "codex exec --skip-git-repo-check <prompt>");
        assert_eq!(entry["working_directory"], "/srv/nomikai");
        assert_eq!(entry["exit_code"], 0);
        assert_eq!(entry["timed_out"], false);
        assert_eq!(entry["elapsed_ms"], 42);
    }
}
