use chrono::{Duration, Utc};
use mindful::db::Database;
use mindful::graph::GoalGraph;
use mindful::models::*;
use speculate2::speculate;

fn create_test_task(db: &Database, text: &str) -> Task {
    db.create_task(CreateTaskInput {
        text: text.to_string(),
        priority: None,
        goal_id: None,
        is_daily: false,
    })
    .expect("Failed to create task")
}

fn write_entry(db: &Database, entry_type: &str, content: &str) -> JournalEntry {
    db.save_journal_entry(SaveJournalEntryInput {
        id: None,
        entry_type: Some(entry_type.to_string()),
        content: content.to_string(),
    })
    .expect("Failed to save entry")
}

fn answers(pairs: &[(&str, &str)]) -> std::collections::BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn create_daily_task(db: &Database, text: &str) -> Task {
    db.create_task(CreateTaskInput {
        text: text.to_string(),
        priority: Some(Priority::High),
        goal_id: None,
        is_daily: true,
    })
    .expect("Failed to create task")
}

speculate! {
    before {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
    }

    describe "goal graph" {
        it "loads an empty snapshot from a fresh database" {
            let snapshot = db.load_graph().expect("Query failed");
            assert!(snapshot.nodes.is_empty());
            assert!(snapshot.links.is_empty());
        }

        it "round-trips the graph with order and adjacency intact" {
            let graph = GoalGraph::example();
            db.save_graph(&graph).expect("Failed to save");

            let loaded = db.load_goal_graph().expect("Failed to load");
            assert_eq!(loaded.snapshot(), graph.snapshot());
            assert_eq!(loaded.get_node("budget").unwrap().children, vec!["savings"]);
            assert_eq!(loaded.get_node("styling").unwrap().parents, vec!["html-css", "web-app"]);
        }

        it "replaces the previous graph on save" {
            db.save_graph(&GoalGraph::example()).expect("Failed to save");

            let mut small = GoalGraph::new();
            small.add_node("only", "The only goal", Category::Health);
            db.save_graph(&small).expect("Failed to save");

            let loaded = db.load_graph().expect("Query failed");
            assert_eq!(loaded.nodes.len(), 1);
            assert_eq!(loaded.nodes[0].category, Category::Health);
            assert!(loaded.links.is_empty());
        }
    }

    describe "tasks" {
        describe "create_task" {
            it "creates an active task with defaults" {
                let task = create_test_task(&db, "  Write tests  ");

                assert!(task.id.starts_with("todo_"));
                assert_eq!(task.text, "Write tests");
                assert_eq!(task.priority, Priority::Medium);
                assert_eq!(task.status, TaskStatus::Active);
                assert!(task.completed_at.is_none());
            }

            it "rejects empty text" {
                let result = db.create_task(CreateTaskInput {
                    text: "   ".to_string(),
                    priority: None,
                    goal_id: None,
                    is_daily: false,
                });
                assert!(result.is_err());
            }
        }

        describe "get_task_lists" {
            it "splits tasks by status in creation order" {
                let first = create_test_task(&db, "first");
                let second = create_test_task(&db, "second");
                let third = create_test_task(&db, "third");
                db.complete_task(&second.id).expect("Failed to complete");

                let lists = db.get_task_lists().expect("Query failed");
                let active: Vec<&str> = lists.active.iter().map(|t| t.id.as_str()).collect();
                assert_eq!(active, vec![first.id.as_str(), third.id.as_str()]);
                assert_eq!(lists.completed.len(), 1);
                assert_eq!(lists.completed[0].id, second.id);
            }
        }

        describe "update_task" {
            it "changes only the given fields" {
                let task = create_test_task(&db, "original");

                let updated = db.update_task(&task.id, UpdateTaskInput {
                    priority: Some(Priority::Low),
                    goal_id: Some("learn-js".to_string()),
                    ..Default::default()
                }).expect("Update failed").expect("Task missing");

                assert_eq!(updated.text, "original");
                assert_eq!(updated.priority, Priority::Low);
                assert_eq!(updated.goal_id.as_deref(), Some("learn-js"));
                assert_eq!(db.get_task(&task.id).unwrap().unwrap(), updated);
            }

            it "unlinks the goal when given an empty goal id" {
                let task = db.create_task(CreateTaskInput {
                    text: "linked".to_string(),
                    priority: None,
                    goal_id: Some("deploy".to_string()),
                    is_daily: false,
                }).expect("Failed to create");

                let updated = db.update_task(&task.id, UpdateTaskInput {
                    goal_id: Some(String::new()),
                    ..Default::default()
                }).unwrap().unwrap();
                assert!(updated.goal_id.is_none());
            }

            it "returns None for an unknown task" {
                let result = db.update_task("missing", UpdateTaskInput::default()).unwrap();
                assert!(result.is_none());
            }
        }

        describe "complete_task and reactivate_task" {
            it "moves a task between the lists" {
                let task = create_test_task(&db, "toggle");

                let done = db.complete_task(&task.id).unwrap().expect("not active");
                assert_eq!(done.status, TaskStatus::Completed);
                assert!(done.completed_at.is_some());
                assert!(db.complete_task(&task.id).unwrap().is_none());

                let back = db.reactivate_task(&task.id).unwrap().expect("not completed");
                assert_eq!(back.status, TaskStatus::Active);
                assert!(back.completed_at.is_none());
                assert!(db.reactivate_task(&task.id).unwrap().is_none());
            }

            it "records the completion date on daily tasks only" {
                let daily = create_daily_task(&db, "stretch");
                let once = create_test_task(&db, "file taxes");

                let daily = db.complete_task(&daily.id).unwrap().unwrap();
                let once = db.complete_task(&once.id).unwrap().unwrap();

                assert_eq!(daily.last_completed, Some(Utc::now().date_naive()));
                assert!(once.last_completed.is_none());
            }
        }

        describe "delete_task and undo_delete_task" {
            it "restores the last deleted task exactly once" {
                let task = create_test_task(&db, "oops");
                assert!(db.delete_task(&task.id).unwrap());
                assert!(db.get_task(&task.id).unwrap().is_none());

                let restored = db.undo_delete_task().unwrap().expect("nothing to undo");
                assert_eq!(restored, task);
                assert!(db.get_task(&task.id).unwrap().is_some());

                assert!(db.undo_delete_task().unwrap().is_none());
            }

            it "keeps only the most recent deletion" {
                let first = create_test_task(&db, "first");
                let second = create_test_task(&db, "second");
                db.delete_task(&first.id).unwrap();
                db.delete_task(&second.id).unwrap();

                let restored = db.undo_delete_task().unwrap().unwrap();
                assert_eq!(restored.id, second.id);
                assert!(db.get_task(&first.id).unwrap().is_none());
            }

            it "returns false for an unknown task" {
                assert!(!db.delete_task("missing").unwrap());
                assert!(db.undo_delete_task().unwrap().is_none());
            }
        }

        describe "delete_tasks_for_goal" {
            it "removes every task linked to the goal" {
                for text in ["a", "b"] {
                    db.create_task(CreateTaskInput {
                        text: text.to_string(),
                        priority: None,
                        goal_id: Some("exercise".to_string()),
                        is_daily: false,
                    }).unwrap();
                }
                let unrelated = create_test_task(&db, "unrelated");

                assert_eq!(db.delete_tasks_for_goal("exercise").unwrap(), 2);
                assert!(db.get_tasks_for_goal("exercise").unwrap().is_empty());
                assert!(db.get_task(&unrelated.id).unwrap().is_some());
            }
        }

        describe "reset_daily_tasks" {
            it "reactivates daily tasks completed on an earlier day" {
                let daily = create_daily_task(&db, "meditate");
                let once = create_test_task(&db, "one-off");
                db.complete_task(&daily.id).unwrap();
                db.complete_task(&once.id).unwrap();

                let tomorrow = Utc::now().date_naive() + Duration::days(1);
                assert_eq!(db.reset_daily_tasks(tomorrow).unwrap(), 1);

                let lists = db.get_task_lists().unwrap();
                assert_eq!(lists.active.len(), 1);
                assert_eq!(lists.active[0].id, daily.id);
                assert_eq!(lists.completed[0].id, once.id);
            }

            it "leaves tasks completed today alone" {
                let daily = create_daily_task(&db, "meditate");
                db.complete_task(&daily.id).unwrap();

                assert_eq!(db.reset_daily_tasks(Utc::now().date_naive()).unwrap(), 0);
                assert_eq!(db.get_tasks(TaskStatus::Completed).unwrap().len(), 1);
            }
        }

        describe "clear_completed_tasks" {
            it "deletes only completed tasks" {
                let keep = create_test_task(&db, "keep");
                let drop = create_test_task(&db, "drop");
                db.complete_task(&drop.id).unwrap();

                assert_eq!(db.clear_completed_tasks().unwrap(), 1);
                let lists = db.get_task_lists().unwrap();
                assert_eq!(lists.active[0].id, keep.id);
                assert!(lists.completed.is_empty());
            }
        }
    }

    describe "journal" {
        it "creates an entry with a timestamp id and default type" {
            let entry = db.save_journal_entry(SaveJournalEntryInput {
                content: "Dear diary".to_string(),
                ..Default::default()
            }).expect("Failed to save");

            assert!(entry.id.parse::<i64>().is_ok());
            assert_eq!(entry.entry_type, DEFAULT_ENTRY_TYPE);
            assert_eq!(entry.created_at, entry.updated_at);
        }

        it "gives entries created in the same millisecond distinct ids" {
            let a = db.save_journal_entry(SaveJournalEntryInput::default()).unwrap();
            let b = db.save_journal_entry(SaveJournalEntryInput::default()).unwrap();
            assert_ne!(a.id, b.id);
        }

        it "overwrites an existing entry and keeps its creation time" {
            let entry = db.save_journal_entry(SaveJournalEntryInput {
                content: "draft".to_string(),
                ..Default::default()
            }).unwrap();

            let saved = db.save_journal_entry(SaveJournalEntryInput {
                id: Some(entry.id.clone()),
                entry_type: Some("gratitude".to_string()),
                content: "final".to_string(),
            }).unwrap();

            assert_eq!(saved.id, entry.id);
            assert_eq!(saved.created_at, entry.created_at);
            assert_eq!(db.get_journal_entries(&JournalFilter::default()).unwrap().len(), 1);

            let stored = db.get_journal_entry(&entry.id).unwrap().unwrap();
            assert_eq!(stored.content, "final");
            assert_eq!(stored.entry_type, "gratitude");
        }

        it "lists the most recently updated entry first" {
            let older = db.save_journal_entry(SaveJournalEntryInput {
                content: "older".to_string(),
                ..Default::default()
            }).unwrap();
            let newer = db.save_journal_entry(SaveJournalEntryInput {
                content: "newer".to_string(),
                ..Default::default()
            }).unwrap();

            let ids: Vec<String> = db.get_journal_entries(&JournalFilter::default()).unwrap().into_iter().map(|e| e.id).collect();
            assert_eq!(ids, vec![newer.id, older.id]);
        }

        it "deletes an entry" {
            let entry = db.save_journal_entry(SaveJournalEntryInput::default()).unwrap();
            assert!(db.delete_journal_entry(&entry.id).unwrap());
            assert!(!db.delete_journal_entry(&entry.id).unwrap());
            assert!(db.get_journal_entry(&entry.id).unwrap().is_none());
        }

        describe "filters" {
            before {
                let morning = write_entry(&db, "gratitude", "Grateful for the MORNING light");
                let work = write_entry(&db, "work", "Long morning of meetings");
                let walk = write_entry(&db, "personal", "An evening walk");
            }

            it "narrows by entry type" {
                let ids: Vec<String> = db.get_journal_entries(&JournalFilter {
                    entry_type: Some("work".to_string()),
                    q: None,
                }).unwrap().into_iter().map(|e| e.id).collect();
                assert_eq!(ids, vec![work.id.clone()]);
            }

            it "treats all and blank types as no filter" {
                for entry_type in ["all", "ALL", "  "] {
                    let entries = db.get_journal_entries(&JournalFilter {
                        entry_type: Some(entry_type.to_string()),
                        q: None,
                    }).unwrap();
                    assert_eq!(entries.len(), 3);
                }
            }

            it "searches content ignoring case" {
                let ids: Vec<String> = db.get_journal_entries(&JournalFilter {
                    entry_type: None,
                    q: Some(" Morning ".to_string()),
                }).unwrap().into_iter().map(|e| e.id).collect();
                assert_eq!(ids, vec![work.id.clone(), morning.id.clone()]);
            }

            it "combines type and search" {
                let entries = db.get_journal_entries(&JournalFilter {
                    entry_type: Some("gratitude".to_string()),
                    q: Some("evening".to_string()),
                }).unwrap();
                assert!(entries.is_empty());

                let entries = db.get_journal_entries(&JournalFilter {
                    entry_type: Some("personal".to_string()),
                    q: Some("EVENING".to_string()),
                }).unwrap();
                assert_eq!(entries.len(), 1);
                assert_eq!(entries[0].id, walk.id);
            }
        }
    }

    describe "analysis" {
        before {
            let entry = write_entry(&db, "personal", "Missed the deadline again");
        }

        it "stores answers and lists newest first" {
            let first = db.create_analysis(CreateAnalysisInput {
                title: "Energy audit".to_string(),
                entry_id: entry.id.clone(),
                answers: answers(&[("What drains you?", "Meetings")]),
            }).expect("Failed to create");
            let second = db.create_analysis(CreateAnalysisInput {
                title: "Weekly review".to_string(),
                entry_id: entry.id.clone(),
                answers: answers(&[("facts", "Two late reports")]),
            }).expect("Failed to create");

            assert_eq!(first.entry_id.as_deref(), Some(entry.id.as_str()));
            let all = db.get_analyses().unwrap();
            assert_eq!(all.len(), 2);
            assert_eq!(all[0].id, second.id);
            assert_eq!(all[1], first);
            assert_eq!(db.get_analysis(&first.id).unwrap(), Some(first));
        }

        it "lists analyses of one entry" {
            let other = write_entry(&db, "personal", "Something else");
            let mine = db.create_analysis(CreateAnalysisInput {
                title: "Mine".to_string(),
                entry_id: entry.id.clone(),
                answers: answers(&[("facts", "a")]),
            }).unwrap();
            db.create_analysis(CreateAnalysisInput {
                title: "Other".to_string(),
                entry_id: other.id.clone(),
                answers: answers(&[("facts", "b")]),
            }).unwrap();

            assert_eq!(db.get_analyses_for_entry(&entry.id).unwrap(), vec![mine]);
            assert!(db.get_analyses_for_entry("missing").unwrap().is_empty());
        }

        it "rejects an unknown journal entry" {
            let result = db.create_analysis(CreateAnalysisInput {
                title: "Orphan".to_string(),
                entry_id: "missing".to_string(),
                answers: answers(&[("facts", "a")]),
            });
            let message = result.unwrap_err().to_string();
            assert!(message.contains("not found"), "{}", message);
            assert!(db.get_analyses().unwrap().is_empty());
        }

        it "rejects an empty title, entry id or answer set" {
            let missing_title = db.create_analysis(CreateAnalysisInput {
                title: " ".to_string(),
                entry_id: entry.id.clone(),
                answers: answers(&[("facts", "a")]),
            });
            assert!(missing_title.is_err());

            let missing_entry = db.create_analysis(CreateAnalysisInput {
                title: "No entry".to_string(),
                entry_id: "  ".to_string(),
                answers: answers(&[("facts", "a")]),
            });
            assert!(missing_entry.is_err());

            let blank_answers = db.create_analysis(CreateAnalysisInput {
                title: "Blank".to_string(),
                entry_id: entry.id.clone(),
                answers: answers(&[("facts", "  "), ("plan", "")]),
            });
            assert!(blank_answers.unwrap_err().to_string().contains("must not be empty"));
        }

        it "is removed together with its journal entry" {
            db.create_analysis(CreateAnalysisInput {
                title: "Gone soon".to_string(),
                entry_id: entry.id.clone(),
                answers: answers(&[("facts", "a")]),
            }).unwrap();

            assert!(db.delete_journal_entry(&entry.id).unwrap());
            assert!(db.get_analyses().unwrap().is_empty());
        }
    }
}
