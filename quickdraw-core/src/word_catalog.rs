use anyhow::{Result, anyhow};
use quickdraw_types::{Category, Difficulty};
use rand::seq::SliceRandom;
use std::path::Path;
use tracing::{debug, info, warn};

/// Fixed set of categories a round can be played in.
#[derive(Debug, Clone)]
pub struct WordCatalog {
    categories: Vec<Category>,
}

impl WordCatalog {
    /// Create a catalog from a list of categories. Fails when there is nothing
    /// to pick from, so `random_category` never has to.
    pub fn new(categories: Vec<Category>) -> Result<Self> {
        if categories.is_empty() {
            return Err(anyhow!("Word catalog needs at least one category"));
        }

        if let Some(empty) = categories.iter().find(|c| c.words.is_empty()) {
            return Err(anyhow!("Category '{}' has no words", empty.name));
        }

        Ok(Self { categories })
    }

    /// The built-in categories shipped with the game
    pub fn builtin() -> Self {
        Self {
            categories: builtin_categories(),
        }
    }

    /// Parse a category from a word list, one word per line. Blank lines and
    /// lines starting with `#` are skipped.
    pub fn from_word_list(name: &str, word_list: &str, difficulty: Difficulty) -> Category {
        let words = word_list
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect();

        Category {
            name: name.to_string(),
            words,
            difficulty,
        }
    }

    /// Load every `<category>.txt` file in a directory. A file may declare its
    /// difficulty with a `# difficulty: hard` header line.
    pub fn from_directory<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mut categories = Vec::new();

        let entries = std::fs::read_dir(dir)
            .map_err(|e| anyhow!("Failed to read category directory {}: {}", dir.display(), e))?;

        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("txt") {
                continue;
            }

            let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
                warn!("Skipping category file with unreadable name: {}", path.display());
                continue;
            };

            let contents = std::fs::read_to_string(&path)?;
            let difficulty = parse_difficulty_header(&contents).unwrap_or_default();
            let category = Self::from_word_list(name, &contents, difficulty);

            debug!("Loaded category '{}' with {} words", name, category.words.len());
            categories.push(category);
        }

        // read_dir order is platform dependent
        categories.sort_by(|a, b| a.name.cmp(&b.name));

        let catalog = Self::new(categories)?;
        info!(
            "Loaded {} categories from {}",
            catalog.categories.len(),
            dir.display()
        );
        Ok(catalog)
    }

    /// Uniformly pick one category
    pub fn random_category(&self) -> &Category {
        let mut rng = rand::thread_rng();
        // The constructors guarantee at least one category
        self.categories
            .choose(&mut rng)
            .unwrap_or(&self.categories[0])
    }

    /// Exact-name lookup
    pub fn find_category(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// Resolve a requested category, falling back to a random one when the
    /// name is missing or unknown.
    pub fn resolve(&self, name: Option<&str>) -> &Category {
        match name {
            Some(name) => self.find_category(name).unwrap_or_else(|| {
                warn!("Unknown category '{}', picking a random one", name);
                self.random_category()
            }),
            None => self.random_category(),
        }
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }
}

impl Default for WordCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn parse_difficulty_header(contents: &str) -> Option<Difficulty> {
    contents
        .lines()
        .map(str::trim)
        .take_while(|line| line.is_empty() || line.starts_with('#'))
        .filter_map(|line| line.trim_start_matches('#').trim().strip_prefix("difficulty:"))
        .find_map(Difficulty::parse)
}

fn builtin_categories() -> Vec<Category> {
    vec![
        Category::new(
            "Fruits",
            &[
                "Apple", "Banana", "Orange", "Grape", "Strawberry", "Pineapple", "Watermelon",
                "Kiwi", "Mango", "Peach", "Pear", "Plum", "Cherry",
            ],
        ),
        Category::new(
            "Animals",
            &[
                "Dog", "Cat", "Elephant", "Lion", "Tiger", "Bear", "Giraffe", "Monkey", "Zebra",
                "Snake", "Dolphin", "Horse", "Cow", "Sheep",
            ],
        ),
        Category::new(
            "Countries",
            &[
                "USA", "Canada", "Japan", "Australia", "Brazil", "France", "Germany", "Italy",
                "Spain", "China", "India", "Russia", "Mexico", "Egypt",
            ],
        ),
        Category::new(
            "Sports",
            &[
                "Soccer", "Basketball", "Tennis", "Golf", "Swimming", "Baseball", "Volleyball",
                "Hockey", "Football", "Rugby", "Cricket", "Boxing",
            ],
        ),
        Category::new(
            "Colors",
            &[
                "Red", "Blue", "Green", "Yellow", "Purple", "Orange", "Pink", "Brown", "Black",
                "White", "Gray", "Gold", "Silver", "Teal",
            ],
        ),
    ]
}
