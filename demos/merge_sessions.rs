//! Concurrent editing sessions on one project.
//!
//! Covers: N-user story editing merged into a server document, and the
//! cost of crossing the serialization boundary.
//!
//! Run with: cargo run --release --example merge_sessions

use std::time::Instant;

use storycollab::validation::MarkdownValidator;
use storycollab::{CollabResult, ProjectManager, Story, StoryLine, Utterance};

fn main() -> CollabResult<()> {
    println!("========================================");
    println!(" StoryCollab Merge Sessions");
    println!("========================================\n");

    n_user_sessions(50)?;
    serialization_overhead()?;
    Ok(())
}

// -----------------------------------------------------------------------------
// 1. N users, each editing their own branch of a shared story
// -----------------------------------------------------------------------------
fn n_user_sessions(users: usize) -> CollabResult<()> {
    println!("Sessions: {} users branching the same story", users);

    let mut server = ProjectManager::new("demo", "en")?;
    server.create_story(
        Story::new("onboarding", "Onboarding")
            .with_line(StoryLine::user(Utterance::new("start")))
            .with_line(StoryLine::bot("utter_welcome")),
    )?;

    let start = Instant::now();
    for i in 0..users {
        let mut client = ProjectManager::from_bytes(&server.save())?;
        let branch = client.add_branch("onboarding", &format!("Path {}", i))?;
        client.insert_line(&branch, 0, StoryLine::user(Utterance::new(format!("choose_{}", i))))?;
        client.insert_line(&branch, 1, StoryLine::bot(format!("utter_path_{}", i)))?;
        server.merge(&mut client)?;
    }
    let duration = start.elapsed();

    let story = server
        .get_story("onboarding")?
        .unwrap_or_else(|| Story::new("onboarding", "missing"));
    let tree = server.validate_story("onboarding", &MarkdownValidator::new())?;

    println!("   Total Time:      {:?}", duration);
    println!(
        "   Merges/sec:      {:.0}",
        users as f64 / duration.as_secs_f64()
    );
    println!("   Branches:        {} (expected {})", story.branches.len(), users);
    println!(
        "   Validation:      {} errors, {} warnings\n",
        tree.total.errors, tree.total.warnings
    );
    Ok(())
}

// -----------------------------------------------------------------------------
// 2. Serialization overhead (proxy for the WASM boundary)
// -----------------------------------------------------------------------------
fn serialization_overhead() -> CollabResult<()> {
    println!("Serialization: 100 stories");

    let mut manager = ProjectManager::new("demo", "en")?;
    for i in 0..100 {
        manager.create_story(
            Story::new(format!("story-{}", i), format!("Story {}", i))
                .with_line(StoryLine::user(Utterance::new("greet")))
                .with_line(StoryLine::bot("utter_hi"))
                .with_line(StoryLine::action("action_log_visit")),
        )?;
    }

    let binary = manager.save();

    let start = Instant::now();
    let mut loaded = ProjectManager::from_bytes(&binary)?;
    let state = loaded.get_state()?;
    let hydrate_time = start.elapsed();

    let start = Instant::now();
    let json = serde_json::to_string(&state)?;
    let json_time = start.elapsed();

    println!("   Load + Hydrate:  {:>8.2?}", hydrate_time);
    println!("   JSON Export:     {:>8.2?} ({} bytes)", json_time, json.len());
    println!(
        "   Binary Size:     {:>8} bytes ({:.1} KB)",
        binary.len(),
        binary.len() as f64 / 1024.0
    );
    println!("   Bytes per Story: {:.0}\n", binary.len() as f64 / 100.0);
    Ok(())
}
