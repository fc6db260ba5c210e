//! Purpose: Hold top-level CLI command dispatch for `rpnstack`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Every client command prints exactly one JSON document on success.

use super::*;

pub(super) fn dispatch_command(command: Command, url: &str) -> Result<(), Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "rpnstack", &mut io::stdout());
            Ok(())
        }
        Command::Serve {
            bind,
            allow_non_loopback,
        } => {
            let config = serve::ServeConfig {
                bind: parse_bind(&bind)?,
                allow_non_loopback,
            };
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(|err| {
                    Error::new(ErrorKind::Internal)
                        .with_message("failed to start runtime")
                        .with_source(err)
                })?;
            runtime.block_on(serve::serve(config))?;
            Ok(())
        }
        Command::Ops => {
            let ops = remote_client(url)?.list_operators()?;
            emit_json(json!({ "ops": ops }));
            Ok(())
        }
        Command::Apply { op, stack } => {
            let contents = remote_client(url)?.apply(&op, &stack)?;
            emit_json(json!({ "stack": stack, "op": op, "contents": contents }));
            Ok(())
        }
        Command::Stack { command } => {
            let client = remote_client(url)?;
            match command {
                StackCommand::List => {
                    let stacks = client.list_stacks()?;
                    emit_json(json!({ "stacks": stacks }));
                }
                StackCommand::Create => {
                    let created = client.create_stack()?;
                    emit_json(json!({
                        "stack": created.key,
                        "location": created.location,
                        "contents": created.values,
                    }));
                }
                StackCommand::Get { stack } => {
                    let contents = client.get_stack(&stack)?;
                    emit_json(json!({ "stack": stack, "contents": contents }));
                }
                StackCommand::Push { stack } => {
                    let contents = client.push(&stack)?;
                    emit_json(json!({ "stack": stack, "contents": contents }));
                }
                StackCommand::Clear { stack } => {
                    let contents = client.clear(&stack)?;
                    emit_json(json!({ "stack": stack, "contents": contents }));
                }
                StackCommand::Delete { stack } => {
                    client.delete_stack(&stack)?;
                    emit_json(json!({ "deleted": stack }));
                }
            }
            Ok(())
        }
    }
}
