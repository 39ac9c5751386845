//! Flavor text for karma replies.
//!
//! Every reply kind has a pool of templates; one is chosen at random per reply.
//! Increments and decrements are prefixed with a short reaction line picked
//! from its own pool. Templates use two placeholders:
//! - `{thing}` - `<@U123>` for users, `:name:` for emoji
//! - `{points_string}` - `1 point` or `N points`

use std::sync::{Arc, Mutex, OnceLock};

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use plusplus_core::{KarmaReply, ReplyKind, Target};

const PLUS_REACTIONS: &[&str] =
    &["Nice!", "Woohoo!", "Boom!", "Sweet!", "Hooray!", "Well played!", "Yesss!", "Awesome!"];

const PLUS_POINTS: &[&str] = &[
    "{thing} now has {points_string}.",
    "{thing} is climbing: {points_string}.",
    "{thing} levels up to {points_string}.",
    "Cheers for {thing}, now at {points_string}.",
];

const MINUS_REACTIONS: &[&str] = &["Ouch.", "Oof.", "Yikes.", "Harsh.", "Welp.", "That stings."];

const MINUS_POINTS: &[&str] = &[
    "{thing} drops to {points_string}.",
    "{thing} is down to {points_string}.",
    "{thing} now has {points_string}.",
    "{thing} slides to {points_string}.",
];

const EQUALS: &[&str] = &[
    "{thing} has {points_string}.",
    "{thing} is sitting at {points_string}.",
    "Current score for {thing}: {points_string}.",
];

const SELF_REJECTED: &[&str] = &[
    "Nice try, {thing}",
    "We've got a cheater over here!",
    "Don't even try me",
    "Great! You now have -∞ points!",
    "{thing} has been banned from Slack.",
    "{thing}--",
];

pub fn points_string(points: i64) -> String {
    if points.abs() == 1 {
        format!("{points} point")
    } else {
        format!("{points} points")
    }
}

pub fn thing(target: &Target) -> String {
    match target {
        Target::User { id } => format!("<@{id}>"),
        Target::Emoji { name } => format!(":{name}:"),
    }
}

fn fill(template: &str, target: &Target, points: i64) -> String {
    template.replace("{thing}", &thing(target)).replace("{points_string}", &points_string(points))
}

pub struct ReplyFormatter {
    rng: Mutex<StdRng>,
}

impl ReplyFormatter {
    pub fn new() -> Self {
        Self { rng: Mutex::new(StdRng::from_entropy()) }
    }

    /// Deterministic choices, for tests.
    pub fn with_seed(seed: u64) -> Self {
        Self { rng: Mutex::new(StdRng::seed_from_u64(seed)) }
    }

    /// Process-wide formatter, seeded once on first use.
    pub fn shared() -> Arc<Self> {
        static SHARED: OnceLock<Arc<ReplyFormatter>> = OnceLock::new();
        Arc::clone(SHARED.get_or_init(|| Arc::new(ReplyFormatter::new())))
    }

    fn pick(&self, options: &[&'static str]) -> &'static str {
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        options.choose(&mut *rng).copied().unwrap_or_default()
    }

    pub fn render(&self, reply: &KarmaReply) -> String {
        let (reaction, templates) = match reply.kind {
            ReplyKind::Increment => (Some(self.pick(PLUS_REACTIONS)), PLUS_POINTS),
            ReplyKind::Decrement => (Some(self.pick(MINUS_REACTIONS)), MINUS_POINTS),
            ReplyKind::Query => (None, EQUALS),
            ReplyKind::SelfRejected => (None, SELF_REJECTED),
        };
        let body = fill(self.pick(templates), &reply.target, reply.points);

        match reaction {
            Some(reaction) => format!("{reaction} {body}"),
            None => body,
        }
    }
}

impl Default for ReplyFormatter {
    fn default() -> Self {
        Self::new()
    }
}
