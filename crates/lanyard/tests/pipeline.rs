//! End-to-end pipeline scenarios driven through the public facade

use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use lanyard::{
    context::{AckHandle, ChannelId, InteractionContext, InteractionId, UserId},
    describe::{
        AutocompleteCallback, CommandCallback, ComponentDescriptor, ContextCommandDescriptor,
        ContextKind, DeclaredType, ModalConstructor, ModalDescriptor, ModalSpec, ModuleDescriptor,
        ParameterDescriptor, RunMode, SlashCommandDescriptor, TextInputBinding,
    },
    error::Error,
    interaction::{
        AutocompleteInvocation, ComponentInvocation, ComponentSource, ContextInvocation,
        ContextTarget, InvokedOption, ModalInvocation, OptionValue, SlashInvocation,
        SubmittedField, Suggestion,
    },
    payload::OptionKind,
    precondition::PreconditionFn,
    Config, InteractionFramework,
};

fn ctx() -> InteractionContext {
    InteractionContext::new(InteractionId(1), UserId(7), ChannelId(3))
}

fn noop() -> CommandCallback { CommandCallback::new(|_, _| async { Ok(()) }) }

fn counting(counter: &Arc<AtomicUsize>) -> CommandCallback {
    let counter = Arc::clone(counter);
    CommandCallback::new(move |_, _| {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    })
}

fn slash_invocation(path: &[&str], options: Vec<InvokedOption>) -> SlashInvocation {
    SlashInvocation {
        path: path.iter().map(ToString::to_string).collect(),
        options,
    }
}

#[tokio::test]
async fn simple_slash_runs_and_reports_once() {
    let framework = InteractionFramework::default();
    let calls = Arc::new(AtomicUsize::new(0));
    framework
        .add_modules(ModuleDescriptor::new("core").slash(SlashCommandDescriptor::new(
            "ping",
            "pong latency",
            counting(&calls),
        )))
        .unwrap();

    let fired = Arc::new(AtomicUsize::new(0));
    let fired2 = Arc::clone(&fired);
    framework.events().slash_executed.subscribe(move |ev| {
        assert!(ev.result.is_ok());
        assert_eq!(ev.command.as_ref().unwrap().name(), "ping");
        fired2.fetch_add(1, Ordering::SeqCst);
    });

    let result = framework
        .execute_slash(ctx(), slash_invocation(&["ping"], vec![]))
        .await;

    assert!(result.is_ok());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn nested_group_commands_get_defaults_filled_in() {
    let framework = InteractionFramework::default();
    let received = Arc::new(Mutex::new(None));

    let rec = Arc::clone(&received);
    let kick = CommandCallback::new(move |_, args| {
        let rec = Arc::clone(&rec);
        async move {
            let user = *args.get::<UserId>(0).unwrap();
            let reason = args.get::<String>(1).unwrap().clone();
            rec.lock().unwrap().replace((user, reason));
            Ok(())
        }
    });

    framework
        .add_modules(
            ModuleDescriptor::new("admin-module")
                .group("admin", "Administrative commands")
                .slash(
                    SlashCommandDescriptor::new("kick", "Kick a user", kick)
                        .parameter(ParameterDescriptor::required::<UserId>("user", "Target"))
                        .parameter(ParameterDescriptor::optional::<String>(
                            "reason",
                            "Reason to record",
                            "none".to_owned(),
                        )),
                ),
        )
        .unwrap();

    let result = framework
        .execute_slash(
            ctx(),
            slash_invocation(&["admin", "kick"], vec![InvokedOption::new(
                "user",
                OptionKind::User,
                OptionValue::User(UserId(123)),
            )]),
        )
        .await;

    assert!(result.is_ok());
    assert_eq!(
        *received.lock().unwrap(),
        Some((UserId(123), "none".to_owned()))
    );
}

#[tokio::test]
async fn subcommands_nested_in_options_are_flattened() {
    let framework = InteractionFramework::default();
    let calls = Arc::new(AtomicUsize::new(0));
    framework
        .add_modules(
            ModuleDescriptor::new("admin-module")
                .group("admin", "Administrative commands")
                .slash(
                    SlashCommandDescriptor::new("kick", "Kick a user", counting(&calls))
                        .parameter(ParameterDescriptor::required::<UserId>("user", "Target")),
                ),
        )
        .unwrap();

    // the platform nests the subcommand inside the options of "/admin"
    let result = framework
        .execute_slash(
            ctx(),
            slash_invocation(&["admin"], vec![InvokedOption::subcommand("kick", vec![
                InvokedOption::new("user", OptionKind::User, OptionValue::User(UserId(5))),
            ])]),
        )
        .await;

    assert!(result.is_ok());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn regex_components_capture_and_convert() {
    let framework = InteractionFramework::default();
    let received = Arc::new(Mutex::new(None));

    let rec = Arc::clone(&received);
    let vote = CommandCallback::new(move |_, args| {
        let rec = Arc::clone(&rec);
        async move {
            rec.lock().unwrap().replace(*args.get::<i64>(0).unwrap());
            Ok(())
        }
    });

    framework
        .add_modules(ModuleDescriptor::new("votes").component(
            ComponentDescriptor::new("vote:{id:int}", vote)
                .parameter(ParameterDescriptor::required::<i64>("id", "Vote ID")),
        ))
        .unwrap();

    let result = framework
        .execute_component(ctx(), ComponentInvocation {
            custom_id: "vote:42".into(),
            source: ComponentSource::Button,
            values: vec![],
        })
        .await;

    assert!(result.is_ok());
    assert_eq!(*received.lock().unwrap(), Some(42));
}

#[tokio::test]
async fn conflicting_wildcards_refuse_registration_and_roll_back() {
    let framework = InteractionFramework::default();
    framework
        .add_modules(ModuleDescriptor::new("first").component(
            ComponentDescriptor::new("a:{x}", noop())
                .parameter(ParameterDescriptor::required::<String>("x", "X")),
        ))
        .unwrap();

    let err = framework
        .add_modules(
            ModuleDescriptor::new("second")
                .component(
                    ComponentDescriptor::new("b:{z}", noop())
                        .parameter(ParameterDescriptor::required::<String>("z", "Z")),
                )
                .component(
                    ComponentDescriptor::new("a:{y}", noop())
                        .parameter(ParameterDescriptor::required::<String>("y", "Y")),
                ),
        )
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateCommand(_)));

    // the partial registration of "second" was rolled back
    let miss = framework
        .execute_component(ctx(), ComponentInvocation {
            custom_id: "b:1".into(),
            source: ComponentSource::Button,
            values: vec![],
        })
        .await;
    assert!(matches!(miss, Err(Error::UnknownCommand)));

    // and the original handler still routes
    let hit = framework
        .execute_component(ctx(), ComponentInvocation {
            custom_id: "a:1".into(),
            source: ComponentSource::Button,
            values: vec![],
        })
        .await;
    assert!(hit.is_ok());
}

#[tokio::test]
async fn missing_required_arguments_never_reach_the_handler() {
    let framework = InteractionFramework::default();
    let calls = Arc::new(AtomicUsize::new(0));
    framework
        .add_modules(ModuleDescriptor::new("m").slash(
            SlashCommandDescriptor::new("kick", "Kick a user", counting(&calls))
                .parameter(ParameterDescriptor::required::<UserId>("user", "Target")),
        ))
        .unwrap();

    let events = Arc::new(Mutex::new(vec![]));
    let ev2 = Arc::clone(&events);
    framework.events().slash_executed.subscribe(move |ev| {
        ev2.lock().unwrap().push(ev.result.clone());
    });

    let result = framework
        .execute_slash(ctx(), slash_invocation(&["kick"], vec![]))
        .await;

    assert!(matches!(result, Err(Error::BadArgs("too few parameters"))));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], Err(Error::BadArgs(_))));
}

#[tokio::test]
async fn select_menu_values_bind_to_the_last_parameter() {
    let framework = InteractionFramework::default();
    let received = Arc::new(Mutex::new(None));

    let rec = Arc::clone(&received);
    let picker = CommandCallback::new(move |_, args| {
        let rec = Arc::clone(&rec);
        async move {
            rec.lock()
                .unwrap()
                .replace(args.get::<Vec<String>>(0).unwrap().clone());
            Ok(())
        }
    });

    framework
        .add_modules(ModuleDescriptor::new("menus").component(
            ComponentDescriptor::new("role-picker", picker).parameter(
                ParameterDescriptor::required::<Vec<String>>("values", "Selected roles"),
            ),
        ))
        .unwrap();

    let result = framework
        .execute_component(ctx(), ComponentInvocation {
            custom_id: "role-picker".into(),
            source: ComponentSource::SelectMenu,
            values: vec!["mods".into(), "devs".into()],
        })
        .await;

    assert!(result.is_ok());
    assert_eq!(
        *received.lock().unwrap(),
        Some(vec!["mods".to_owned(), "devs".to_owned()])
    );
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Feedback {
    subject: String,
    body: String,
}

fn feedback_modal() -> ModalSpec {
    ModalSpec {
        ty: DeclaredType::of::<Feedback>(),
        inputs: vec![
            TextInputBinding {
                custom_id: "subject".into(),
                required: true,
            },
            TextInputBinding {
                custom_id: "body".into(),
                required: false,
            },
        ],
        construct: ModalConstructor::new(|mut values| {
            let body = values.pop().flatten().unwrap_or_default();
            let subject = values.pop().flatten().unwrap_or_default();
            Ok(Box::new(Feedback { subject, body }))
        }),
    }
}

#[tokio::test]
async fn modal_submissions_build_the_declared_struct() {
    let framework = InteractionFramework::default();
    let received = Arc::new(Mutex::new(None));

    let rec = Arc::clone(&received);
    let handler = CommandCallback::new(move |_, args| {
        let rec = Arc::clone(&rec);
        async move {
            rec.lock()
                .unwrap()
                .replace(args.get::<Feedback>(0).unwrap().clone());
            Ok(())
        }
    });

    framework
        .add_modules(
            ModuleDescriptor::new("feedback-module").modal(ModalDescriptor::new(
                "feedback",
                feedback_modal(),
                handler,
            )),
        )
        .unwrap();

    let result = framework
        .execute_modal(ctx(), ModalInvocation {
            custom_id: "feedback".into(),
            fields: vec![
                SubmittedField {
                    custom_id: "body".into(),
                    value: "works great".into(),
                },
                SubmittedField {
                    custom_id: "subject".into(),
                    value: "praise".into(),
                },
            ],
        })
        .await;

    assert!(result.is_ok());
    assert_eq!(
        *received.lock().unwrap(),
        Some(Feedback {
            subject: "praise".into(),
            body: "works great".into(),
        })
    );
}

#[tokio::test]
async fn missing_required_modal_fields_convert_fail() {
    let framework = InteractionFramework::default();
    framework
        .add_modules(ModuleDescriptor::new("feedback-module").modal(ModalDescriptor::new(
            "feedback",
            feedback_modal(),
            noop(),
        )))
        .unwrap();

    let result = framework
        .execute_modal(ctx(), ModalInvocation {
            custom_id: "feedback".into(),
            fields: vec![SubmittedField {
                custom_id: "body".into(),
                value: "no subject".into(),
            }],
        })
        .await;

    assert!(matches!(result, Err(Error::ConvertFailed { .. })));
}

#[tokio::test]
async fn context_commands_receive_their_target() {
    let framework = InteractionFramework::default();
    let received = Arc::new(Mutex::new(None));

    let rec = Arc::clone(&received);
    let report = CommandCallback::new(move |_, args| {
        let rec = Arc::clone(&rec);
        async move {
            rec.lock().unwrap().replace(*args.get::<UserId>(0).unwrap());
            Ok(())
        }
    });

    framework
        .add_modules(ModuleDescriptor::new("m").context(ContextCommandDescriptor::new(
            "Report User",
            ContextKind::User,
            report,
        )))
        .unwrap();

    let result = framework
        .execute_context(ctx(), ContextInvocation {
            name: "Report User".into(),
            target: ContextTarget::User(UserId(99)),
        })
        .await;

    assert!(result.is_ok());
    assert_eq!(*received.lock().unwrap(), Some(UserId(99)));
}

#[tokio::test]
async fn precondition_failures_short_circuit() {
    let framework = InteractionFramework::default();
    let calls = Arc::new(AtomicUsize::new(0));

    framework
        .add_modules(
            ModuleDescriptor::new("m")
                .precondition(Arc::new(PreconditionFn::new(|_, _| {
                    Err("not allowed".to_owned())
                })))
                .slash(SlashCommandDescriptor::new(
                    "secret",
                    "A guarded command",
                    counting(&calls),
                )),
        )
        .unwrap();

    let result = framework
        .execute_slash(ctx(), slash_invocation(&["secret"], vec![]))
        .await;

    match result {
        Err(Error::UnmetPrecondition(reason)) => assert_eq!(reason, "not allowed"),
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn handler_errors_surface_as_exceptions() {
    let framework = InteractionFramework::default();
    framework
        .add_modules(ModuleDescriptor::new("m").slash(SlashCommandDescriptor::new(
            "boom",
            "Always fails",
            CommandCallback::new(|_, _| async { panic!("kaboom") }),
        )))
        .unwrap();

    let result = framework
        .execute_slash(ctx(), slash_invocation(&["boom"], vec![]))
        .await;

    match result {
        Err(Error::Exception(err)) => assert!(err.to_string().contains("kaboom")),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
#[should_panic(expected = "kaboom")]
async fn throw_on_error_re_raises_handler_panics() {
    let framework = InteractionFramework::new(Config {
        throw_on_error: true,
        ..Config::default()
    });
    framework
        .add_modules(ModuleDescriptor::new("m").slash(SlashCommandDescriptor::new(
            "boom",
            "Always fails",
            CommandCallback::new(|_, _| async { panic!("kaboom") }),
        )))
        .unwrap();

    let _ = framework
        .execute_slash(ctx(), slash_invocation(&["boom"], vec![]))
        .await;
}

#[tokio::test]
async fn detached_dispatch_returns_immediately_and_reports_later() {
    let framework = InteractionFramework::default();
    let calls = Arc::new(AtomicUsize::new(0));

    framework
        .add_modules(ModuleDescriptor::new("m").slash(
            SlashCommandDescriptor::new("bg", "Background work", counting(&calls))
                .run_mode(RunMode::Async),
        ))
        .unwrap();

    let fired = Arc::new(AtomicUsize::new(0));
    let fired2 = Arc::clone(&fired);
    framework.events().slash_executed.subscribe(move |ev| {
        assert!(ev.result.is_ok());
        fired2.fetch_add(1, Ordering::SeqCst);
    });

    let result = framework
        .execute_slash(ctx(), slash_invocation(&["bg"], vec![]))
        .await;
    assert!(result.is_ok());

    for _ in 0..100 {
        if fired.load(Ordering::SeqCst) == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[derive(Debug)]
struct MockAck(AtomicBool);

#[async_trait::async_trait]
impl AckHandle for MockAck {
    async fn delete(&self) -> anyhow::Result<()> {
        self.0.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn unknown_commands_optionally_delete_their_ack() {
    let framework = InteractionFramework::new(Config {
        delete_unknown_command_ack: true,
        ..Config::default()
    });

    let ack = Arc::new(MockAck(AtomicBool::new(false)));
    let result = framework
        .execute_slash(
            ctx().with_ack(Arc::clone(&ack) as Arc<dyn AckHandle>),
            slash_invocation(&["nope"], vec![]),
        )
        .await;

    assert!(matches!(result, Err(Error::UnknownCommand)));
    assert!(ack.0.load(Ordering::SeqCst));
}

#[tokio::test]
async fn autocomplete_resolves_the_focused_parameter() {
    let framework = InteractionFramework::default();

    let songs = ["fracture", "freefall", "gravity"];
    let suggest = AutocompleteCallback::new(move |_, input| async move {
        Ok(songs
            .iter()
            .filter(|s| s.starts_with(&input))
            .map(|s| Suggestion::plain(*s))
            .collect())
    });

    framework
        .add_modules(ModuleDescriptor::new("music").slash(
            SlashCommandDescriptor::new("play", "Play a song", noop()).parameter(
                ParameterDescriptor::required::<String>("song", "Song to play")
                    .autocomplete(suggest),
            ),
        ))
        .unwrap();

    let suggestions = framework
        .execute_autocomplete(ctx(), AutocompleteInvocation {
            path: vec!["play".into()],
            options: vec![InvokedOption::new(
                "song",
                OptionKind::String,
                OptionValue::String("fr".into()),
            )
            .focused()],
        })
        .await
        .unwrap();

    let names: Vec<_> = suggestions.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["fracture", "freefall"]);
}

#[tokio::test]
async fn removed_modules_stop_routing() {
    let framework = InteractionFramework::default();
    framework
        .add_modules(ModuleDescriptor::new("temp").slash(SlashCommandDescriptor::new(
            "ping",
            "pong latency",
            noop(),
        )))
        .unwrap();

    assert!(framework
        .execute_slash(ctx(), slash_invocation(&["ping"], vec![]))
        .await
        .is_ok());

    assert!(framework.remove_module("temp"));
    assert!(!framework.remove_module("temp"));

    let result = framework
        .execute_slash(ctx(), slash_invocation(&["ping"], vec![]))
        .await;
    assert!(matches!(result, Err(Error::UnknownCommand)));
    assert!(framework.modules().is_empty());
}

#[tokio::test]
async fn custom_id_delimiters_split_into_path_segments() {
    let framework = InteractionFramework::new(Config {
        custom_id_delimiters: vec![':'],
        ..Config::default()
    });
    let received = Arc::new(Mutex::new(None));

    let rec = Arc::clone(&received);
    let handler = CommandCallback::new(move |_, args| {
        let rec = Arc::clone(&rec);
        async move {
            rec.lock().unwrap().replace(*args.get::<i64>(0).unwrap());
            Ok(())
        }
    });

    framework
        .add_modules(ModuleDescriptor::new("votes").component(
            ComponentDescriptor::new("vote:up:{id:int}", handler)
                .parameter(ParameterDescriptor::required::<i64>("id", "Vote ID")),
        ))
        .unwrap();

    let result = framework
        .execute_component(ctx(), ComponentInvocation {
            custom_id: "vote:up:17".into(),
            source: ComponentSource::Button,
            values: vec![],
        })
        .await;

    assert!(result.is_ok());
    assert_eq!(*received.lock().unwrap(), Some(17));
}
