//! Plain-text output for CLI commands.

use tether_mcp::{Content, GetPromptResult, McpClient, Prompt, Resource, Role, Tool};

pub fn server(client: &McpClient, tool_count: Option<usize>) {
    let info = client.server_info();
    let tools = match tool_count {
        Some(n) => format!("{n} tools"),
        None => "tools unavailable".to_string(),
    };
    println!(
        "{} [{}] {} v{} (protocol {}, {})",
        client.server_name(),
        client.transport_kind(),
        info.name,
        info.version,
        info.protocol_version,
        tools
    );
}

pub fn tools(tools: &[Tool]) {
    for tool in tools {
        if tool.description.is_empty() {
            println!("{}", tool.name);
        } else {
            println!("{} — {}", tool.name, tool.description);
        }
    }
}

pub fn resources(resources: &[Resource]) {
    for resource in resources {
        let mime = resource.mime_type.as_deref().unwrap_or("?");
        println!("{} ({}) {}", resource.uri, mime, resource.name);
    }
}

pub fn prompts(prompts: &[Prompt]) {
    for prompt in prompts {
        let args: Vec<String> = prompt
            .arguments
            .iter()
            .map(|a| {
                if a.required {
                    a.name.clone()
                } else {
                    format!("[{}]", a.name)
                }
            })
            .collect();
        println!("{}({})", prompt.name, args.join(", "));
        if let Some(desc) = &prompt.description {
            println!("    {desc}");
        }
    }
}

pub fn prompt(result: &GetPromptResult) {
    if let Some(desc) = &result.description {
        println!("# {desc}");
    }
    for message in &result.messages {
        let role = match message.role {
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        println!("{role}: {}", describe(&message.content));
    }
}

pub fn contents(contents: &[Content]) {
    for content in contents {
        println!("{}", describe(content));
    }
}

fn describe(content: &Content) -> String {
    match content {
        Content::Text { text } => text.clone(),
        Content::Binary { data, mime_type } => {
            format!("[{mime_type}, {} base64 chars]", data.len())
        }
    }
}
