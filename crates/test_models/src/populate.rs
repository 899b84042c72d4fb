//! Seeded blog fixture graphs.
//!
//! Fills a registry over the blog schema with authors, their articles,
//! drafts inheriting article titles, and co-writes linking articles to
//! other authors. The same seed and scale always yield the same graph.

use crate::fake::FakeData;
use fixture_upper::{fields, inherit_attr, Registry, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Generation scale presets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scale {
    /// ~50 fixtures
    Small,
    /// ~1,000 fixtures
    Medium,
    /// ~10,000 fixtures
    Large,
}

impl Scale {
    pub fn authors(&self) -> usize {
        match self {
            Scale::Small => 4,
            Scale::Medium => 50,
            Scale::Large => 400,
        }
    }

    pub fn max_articles_per_author(&self) -> usize {
        match self {
            Scale::Small => 3,
            Scale::Medium => 6,
            Scale::Large => 8,
        }
    }

    pub fn max_drafts_per_article(&self) -> usize {
        match self {
            Scale::Small => 2,
            Scale::Medium => 3,
            Scale::Large => 4,
        }
    }

    /// Probability that an article gets a co-writer
    pub fn co_write_probability(&self) -> f64 {
        match self {
            Scale::Small => 0.5,
            Scale::Medium => 0.3,
            Scale::Large => 0.2,
        }
    }
}

/// Number of fixtures created per type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Population {
    pub authors: usize,
    pub articles: usize,
    pub drafts: usize,
    pub co_writes: usize,
}

impl Population {
    pub fn total(&self) -> usize {
        self.authors + self.articles + self.drafts + self.co_writes
    }
}

pub struct Populator {
    rng: ChaCha8Rng,
    scale: Scale,
    fake: FakeData<ChaCha8Rng>,
}

impl Populator {
    pub fn new(seed: u64, scale: Scale) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(seed);
        let fake_rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(1));
        Self {
            rng,
            scale,
            fake: FakeData::new(fake_rng),
        }
    }

    /// Create the graph through `registry`'s blog builders.
    pub fn populate(&mut self, registry: &Registry) -> Result<Population> {
        let authors_fu = registry.get_upper("Author")?;
        let articles_fu = registry.get_upper("Article")?;
        let drafts_fu = registry.get_upper("Draft")?;
        let co_writes_fu = registry.get_upper("CoWrite")?;
        let mut counts = Population::default();

        let mut authors = Vec::with_capacity(self.scale.authors());
        for _ in 0..self.scale.authors() {
            authors.push(authors_fu.fixup(fields! {
                "name" => self.fake.full_name(),
                "alias" => self.fake.alias(),
            })?);
        }
        counts.authors = authors.len();

        for (i, author) in authors.iter().enumerate() {
            let n_articles = self.fake.int_range(1, self.scale.max_articles_per_author());
            for _ in 0..n_articles {
                let article = articles_fu.fixup(fields! {
                    "author" => author,
                    "title" => self.fake.title(4),
                    "is_visible" => self.fake.bool_with_probability(0.7),
                })?;
                counts.articles += 1;

                let n_drafts = self.fake.int_range(0, self.scale.max_drafts_per_article());
                for _ in 0..n_drafts {
                    drafts_fu.fixup(fields! {
                        "article" => &article,
                        "title" => inherit_attr("article", "title"),
                        "sub_title" => self.fake.title(2),
                    })?;
                    counts.drafts += 1;
                }

                if authors.len() > 1 && self.rng.random_bool(self.scale.co_write_probability()) {
                    let offset = self.rng.random_range(1..authors.len());
                    let co_author = &authors[(i + offset) % authors.len()];
                    co_writes_fu.fixup(fields! {
                        "article" => &article,
                        "author" => co_author,
                    })?;
                    counts.co_writes += 1;
                }
            }
        }
        Ok(counts)
    }
}
