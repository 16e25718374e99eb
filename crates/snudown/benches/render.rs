//! Benchmarks for usertext rendering with and without a table of contents.

#![allow(clippy::format_push_string)] // Benchmark setup code, performance not critical

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use snudown::{FnResolver, RenderRequest, Renderer};

/// Generate a comment-like document with headings, links and mentions.
fn generate_markdown(headings: usize, paragraphs_per_section: usize) -> String {
    let mut md = String::with_capacity(headings * 50 + headings * paragraphs_per_section * 200);
    for i in 0..headings {
        md.push_str(&format!("## Section {i}\n\n"));
        for j in 0..paragraphs_per_section {
            md.push_str(&format!(
                "Paragraph {j} thanks @user{j} for **bold** work, see http://example.com/{i}/{j}.\n\n"
            ));
        }
        md.push_str("<table><tr><td>cell</td></tr></table>\n\n");
    }
    md
}

fn renderer() -> Renderer {
    let renderer = Renderer::new();
    renderer.register_resolver(Some(Arc::new(
        FnResolver::new().with_exists(|name| Ok(name.ends_with('0'))),
    )));
    renderer
}

fn bench_render_simple(c: &mut Criterion) {
    let renderer = renderer();
    let request = RenderRequest::new("Hello, *world*!");

    c.bench_function("render_simple_usertext", |b| {
        b.iter(|| renderer.render(&request));
    });
}

fn bench_render_with_toc(c: &mut Criterion) {
    let renderer = renderer();
    let markdown = generate_markdown(10, 2);
    let request = RenderRequest::new(markdown.as_str())
        .with_toc(true)
        .with_toc_id_prefix("md-")
        .with_nofollow(true)
        .with_target("_blank")
        .with_domain("example.com");

    c.bench_function("render_with_toc_10_headings", |b| {
        b.iter(|| renderer.render(&request));
    });
}

fn bench_render_varying_sizes(c: &mut Criterion) {
    let renderer = renderer();
    let mut group = c.benchmark_group("render_by_size");

    for (headings, paragraphs) in [(5, 2), (20, 3), (50, 5)] {
        let markdown = generate_markdown(headings, paragraphs);
        let request = RenderRequest::new(markdown.as_str()).with_nofollow(true);

        group.throughput(Throughput::Bytes(markdown.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("usertext", format!("{headings}h_{paragraphs}p")),
            &request,
            |b, request| b.iter(|| renderer.render(request)),
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_render_simple,
    bench_render_with_toc,
    bench_render_varying_sizes
);
criterion_main!(benches);
