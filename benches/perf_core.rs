use chrono::{Duration, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use promptsmith::app::cards::CardDeck;
use promptsmith::app::orchestrator::Orchestrator;
use promptsmith::catalog::Category;
use promptsmith::editor::markup;
use promptsmith::editor::Editor;
use promptsmith::history::{DateRange, HistoryFilter, HistoryItem, HistoryLog, HISTORY_LIMIT};
use promptsmith::llm::{ClientSettings, EnhancedPrompt, GenerationService, OpenRouterClient};
use promptsmith::store::{Store, HISTORY_KEY};
use promptsmith::ui::{self, App};
use ratatui::backend::TestBackend;
use ratatui::Terminal;
use std::sync::{mpsc, Arc};
use std::time::Instant;

fn synthetic_draft(paragraphs: usize) -> String {
    let mut text = String::new();
    for i in 0..paragraphs {
        text.push_str(&format!("# Section {i}\n"));
        text.push_str("Explain **why** the *cache* misses, then list fixes:\n");
        text.push_str("- measure first\n  - compare `p99` before and after\n");
        text.push_str("```rust\nfn lookup(key: &str) -> Option<usize> { None }\n```\n");
    }
    text
}

fn synthetic_history(count: usize) -> HistoryLog {
    let now = Utc::now();
    let mut log = HistoryLog::default();
    for i in 0..count {
        let outputs = vec![EnhancedPrompt {
            technique: "Chain-of-Thought".to_string(),
            prompt: format!("Think step by step about topic {i}"),
            explanation: String::new(),
        }];
        let category = Category::ALL[i % Category::ALL.len()];
        let created = now - Duration::hours(i as i64 * 3);
        let mut item = HistoryItem::new(format!("Summarize topic {i}"), category, outputs, created);
        item.is_favorite = i % 7 == 0;
        log.push(item);
    }
    log
}

fn bench_markup(c: &mut Criterion) {
    let draft = synthetic_draft(200);
    c.bench_function("markup_plain_text", |b| {
        b.iter(|| black_box(markup::plain_text(black_box(&draft))));
    });

    let mut editor = Editor::default();
    c.bench_function("editor_set_content", |b| {
        b.iter(|| {
            editor.set_content("");
            black_box(editor.set_content(black_box(&draft)));
        });
    });
}

fn bench_history_view(c: &mut Criterion) {
    let log = synthetic_history(HISTORY_LIMIT);
    let now = Utc::now();
    let filter = HistoryFilter {
        search: "topic 4".to_string(),
        category: None,
        date: DateRange::LastWeek,
        favorites_only: false,
    };

    c.bench_function("history_view_filtered", |b| {
        b.iter(|| black_box(log.view(black_box(&filter), now).len()));
    });
}

fn bench_render_frame(c: &mut Criterion) {
    let store = Store::in_memory();
    store.save(HISTORY_KEY, &synthetic_history(HISTORY_LIMIT));

    let client = OpenRouterClient::new(ClientSettings::default()).expect("client should build");
    let service: Arc<dyn GenerationService> = Arc::new(client);
    let (tx, _rx) = mpsc::channel();
    let now = Instant::now();
    let mut orchestrator = Orchestrator::load(Arc::clone(&service), store, tx.clone(), now);
    orchestrator.set_prompt(&synthetic_draft(20), now);
    let cards = CardDeck::new(service, tx);
    let mut app = App::new(orchestrator, cards, std::env::temp_dir());
    app.sync_from_draft();

    let backend = TestBackend::new(140, 42);
    let mut terminal = Terminal::new(backend).expect("terminal should initialize");

    c.bench_function("render_frame_main", |b| {
        b.iter(|| {
            terminal
                .draw(|frame| ui::render(frame, &app))
                .expect("draw should succeed");
        });
    });
}

criterion_group!(benches, bench_markup, bench_history_view, bench_render_frame);
criterion_main!(benches);
