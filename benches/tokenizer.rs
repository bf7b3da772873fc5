use std::{hint::black_box, sync::Arc};

use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use fts_cjk::{
    DEFAULT_PINYIN_MAX_LEN, Enumerator, HighlightStyle, Highlighter, LexiconSegmenter, OptionMask,
    PinyinExpander, TokenizeMode, preload,
};
use rusqlite::params;

fn sample_texts(count: usize) -> Vec<String> {
    let templates = [
        "你好世界，全文检索分词器基准测试。",
        "SQLite FTS5 tokenizer with pinyin expansion.",
        "再来一段中文内容，覆盖拼音缩写与音节匹配。",
        "ＦＵＬＬ－ＷＩＤＴＨ ｔｅｘｔ mixed with 中文 and 2024 digits.",
        "混合内容：你好世界 and local-first search powered by fts-cjk.",
    ];
    (0..count)
        .map(|i| templates[i % templates.len()].to_string())
        .collect()
}

fn enumerator(options: OptionMask) -> Enumerator {
    preload();
    Enumerator::new(
        Arc::new(LexiconSegmenter::process()),
        Arc::new(PinyinExpander::new()),
        options,
    )
}

fn bench_enumeration(c: &mut Criterion) {
    let texts = sample_texts(5);
    let bytes: u64 = texts.iter().map(|t| t.len() as u64).sum();
    let mut group = c.benchmark_group("tokenizer_enumerate");
    group.throughput(Throughput::Bytes(bytes));

    for (label, options) in [
        ("plain", OptionMask::empty()),
        ("pinyin", OptionMask::pinyin(DEFAULT_PINYIN_MAX_LEN)),
        (
            "pinyin_transform",
            OptionMask::pinyin(64) | OptionMask::TRANSFORM,
        ),
    ] {
        let enumerator = enumerator(options);
        let texts = texts.clone();
        group.bench_function(BenchmarkId::from_parameter(label), move |b| {
            b.iter(|| {
                for text in &texts {
                    let tokens = enumerator
                        .tokens(text.as_bytes(), TokenizeMode::Document)
                        .expect("tokenize");
                    black_box(tokens.len());
                }
            })
        });
    }

    group.finish();
}

fn bench_highlight(c: &mut Criterion) {
    let enumerator = enumerator(OptionMask::pinyin(DEFAULT_PINYIN_MAX_LEN));
    let texts = sample_texts(5);
    let mut group = c.benchmark_group("tokenizer_highlight");

    for keyword in ["nihao", "中文", "pinyin expansion"] {
        let highlighter = Highlighter::new(&enumerator, keyword, 64, HighlightStyle::default())
            .expect("keyword");
        let texts = texts.clone();
        group.bench_function(BenchmarkId::from_parameter(keyword), move |b| {
            b.iter(|| {
                for text in &texts {
                    black_box(highlighter.highlight_text(text).expect("highlight").hits);
                }
            })
        });
    }

    group.finish();
}

fn bench_fts5_insert(c: &mut Criterion) {
    preload();
    let texts = sample_texts(64);
    let mut group = c.benchmark_group("tokenizer_fts5");

    group.bench_function("insert_64", move |b| {
        b.iter_batched(
            || {
                let mut session = fts_cjk::FtsSession::open_in_memory().expect("open");
                session
                    .register("cjk", OptionMask::pinyin(DEFAULT_PINYIN_MAX_LEN))
                    .expect("register");
                session
                    .connection()
                    .execute_batch("CREATE VIRTUAL TABLE docs USING fts5(body, tokenize = 'cjk')")
                    .expect("create table");
                session
            },
            |session| {
                for text in &texts {
                    session
                        .connection()
                        .execute("INSERT INTO docs(body) VALUES (?1)", params![text])
                        .expect("insert");
                }
                black_box(session);
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_enumeration, bench_highlight, bench_fts5_insert);
criterion_main!(benches);
