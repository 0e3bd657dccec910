use crate::provider::{InvocationSpec, ToolRequest};

pub fn build_invocation(request: &ToolRequest) -> InvocationSpec {
    let mut args = vec!["exec".to_string(), "--skip-git-repo-check".to_string()];

    if request.options.web_search == Some(false) {
        args.push("-c".to_string());
        args.push("features.web_search_request=false".to_string());
    }
    if let Some(model) = request.options.model.as_deref() {
        args.push("-c".to_string());
        args.push(format!("model=\"{model}\""));
    }
    if let Some(effort) = request.options.reasoning_effort.as_deref() {
        args.push("-c".to_string());
        args.push(format!("reasoning.effort=\"{effort}\""));
    }

    args.push(request.prompt.clone());
    InvocationSpec {
        binary: request.binary.clone(),
        args,
    }
}
