//! Benchmarks for the story editing core and the project document.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use storycollab::response::update_sequence;
use storycollab::story::Entity;
use storycollab::validation::MarkdownValidator;
use storycollab::{
    ProjectManager, Response, ResponseBlock, ResponseCatalog, Story, StoryLine, Utterance,
    ValidationTree,
};

fn sample_story(id: &str) -> Story {
    Story::new(id, "Greeting")
        .with_line(StoryLine::user(
            Utterance::new("greet").with_entity(Entity::new("name", "ada")),
        ))
        .with_line(StoryLine::bot("utter_hi"))
        .with_line(StoryLine::action("action_log_visit"))
        .with_line(StoryLine::slot("visited", Some("true".to_string())))
}

/// A story whose branch tree is `width` wide at each of `depth` levels.
fn branched_story(id: &str, width: usize, depth: usize) -> Story {
    let mut story = sample_story(id);
    if depth > 0 {
        for i in 0..width {
            story = story.with_branch(branched_story(&format!("{}-{}", id, i), width, depth - 1));
        }
    }
    story
}

fn manager_with_stories(count: usize) -> ProjectManager {
    let mut manager = ProjectManager::new("bench", "en").unwrap();
    for i in 0..count {
        manager.create_story(sample_story(&format!("story-{}", i))).unwrap();
    }
    manager
}

fn catalog(size: usize) -> ResponseCatalog {
    (0..size)
        .map(|i| {
            Response::new(format!("utter_{}", i))
                .with_variant("en", vec![ResponseBlock::new("text: hello")])
                .with_variant("fr", vec![ResponseBlock::new("text: bonjour")])
        })
        .collect()
}

fn bench_new(c: &mut Criterion) {
    c.bench_function("new", |b| {
        b.iter(|| black_box(ProjectManager::new("bench", "en").unwrap()))
    });
}

fn bench_create_story(c: &mut Criterion) {
    c.bench_function("create_story", |b| {
        let mut manager = ProjectManager::new("bench", "en").unwrap();
        let mut i = 0u64;
        b.iter(|| {
            manager.create_story(sample_story(&format!("story-{}", i))).unwrap();
            i += 1;
        })
    });
}

fn bench_insert_line(c: &mut Criterion) {
    c.bench_function("insert_line", |b| {
        let mut manager = manager_with_stories(10);
        b.iter(|| {
            manager
                .insert_line("story-5", 1, StoryLine::bot("utter_more"))
                .unwrap();
        })
    });
}

fn bench_get_state(c: &mut Criterion) {
    let mut group = c.benchmark_group("get_state");

    for num_stories in [1, 10, 50, 100].iter() {
        let mut manager = manager_with_stories(*num_stories);
        let bytes = manager.save();

        group.bench_with_input(
            BenchmarkId::new("stories", num_stories),
            num_stories,
            |b, _| {
                b.iter(|| {
                    // Fresh load so nothing is cached
                    let mut m = ProjectManager::from_bytes(&bytes).unwrap();
                    black_box(m.get_state().unwrap())
                })
            },
        );
    }
    group.finish();
}

fn bench_save(c: &mut Criterion) {
    let mut group = c.benchmark_group("save");

    for num_stories in [1, 10, 50].iter() {
        let mut manager = manager_with_stories(*num_stories);
        group.bench_with_input(
            BenchmarkId::new("stories", num_stories),
            num_stories,
            |b, _| b.iter(|| black_box(manager.save())),
        );
    }
    group.finish();
}

fn bench_merge(c: &mut Criterion) {
    c.bench_function("merge_10_stories", |b| {
        let base_bytes = manager_with_stories(10).save();

        b.iter(|| {
            let mut client_a = ProjectManager::from_bytes(&base_bytes).unwrap();
            let mut client_b = ProjectManager::from_bytes(&base_bytes).unwrap();

            client_a.create_story(sample_story("new-a")).unwrap();
            client_b
                .insert_line("story-3", 0, StoryLine::action("action_b"))
                .unwrap();

            client_a.merge(&mut client_b).unwrap();
            black_box(&client_a);
        })
    });
}

fn bench_update_sequence(c: &mut Criterion) {
    let mut group = c.benchmark_group("update_sequence");

    for size in [10, 100, 1000].iter() {
        let responses = catalog(*size);
        let key = format!("utter_{}", size / 2);
        group.bench_with_input(BenchmarkId::new("responses", size), size, |b, _| {
            b.iter(|| {
                black_box(
                    update_sequence(&responses, &key, "fr", |seq| {
                        let mut seq = seq.to_vec();
                        seq.push(ResponseBlock::new("text: encore"));
                        Ok(seq)
                    })
                    .unwrap(),
                )
            })
        });
    }
    group.finish();
}

fn bench_validation_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("validation_tree");
    let validator = MarkdownValidator::new();

    for depth in [1, 2, 3].iter() {
        let story = branched_story("root", 3, *depth);
        group.bench_with_input(BenchmarkId::new("depth", depth), depth, |b, _| {
            b.iter(|| black_box(ValidationTree::build(&story, &validator)))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_new,
    bench_create_story,
    bench_insert_line,
    bench_get_state,
    bench_save,
    bench_merge,
    bench_update_sequence,
    bench_validation_tree,
);

criterion_main!(benches);
