//! Built-in practice tasks so the app is useful without a TOML bank.

use crate::domain::{Level, Task, TaskKind, TaskSource};

fn seed(id: &str, kind: TaskKind, level: Level, title: &str, prompt: &str) -> Task {
  Task {
    id: id.into(),
    kind,
    level,
    title: title.into(),
    prompt: prompt.into(),
    source: TaskSource::Seed,
  }
}

pub fn seed_tasks() -> Vec<Task> {
  vec![
    seed(
      "w1-internet-usage",
      TaskKind::WritingTask1,
      Level::Intermediate,
      "Internet usage by age group",
      "The bar chart shows the percentage of people in three age groups who used the internet daily in 2000, 2010 and 2020. Summarise the information by selecting and reporting the main features, and make comparisons where relevant. Write at least 150 words.",
    ),
    seed(
      "w2-remote-work",
      TaskKind::WritingTask2,
      Level::Intermediate,
      "Working from home",
      "More and more people are working from home rather than in an office. Do the advantages of this development outweigh the disadvantages? Give reasons for your answer and include any relevant examples from your own knowledge or experience. Write at least 250 words.",
    ),
    seed(
      "w2-public-transport",
      TaskKind::WritingTask2,
      Level::Beginner,
      "Free public transport",
      "Some people think public transport should be free for everyone. To what extent do you agree or disagree? Write at least 250 words.",
    ),
    seed(
      "w2-university-fees",
      TaskKind::WritingTask2,
      Level::Advanced,
      "Funding higher education",
      "Some argue that university education should be funded entirely by governments, while others believe students should pay for their own studies. Discuss both views and give your own opinion. Write at least 250 words.",
    ),
    seed(
      "s1-hometown",
      TaskKind::SpeakingPart1,
      Level::Beginner,
      "Hometown",
      "Where is your hometown? What do you like most about it? Has it changed much since you were a child?",
    ),
    seed(
      "s2-memorable-trip",
      TaskKind::SpeakingPart2,
      Level::Intermediate,
      "A memorable trip",
      "Describe a trip you remember well. You should say: where you went, who you went with, what you did there, and explain why this trip was memorable.",
    ),
    seed(
      "s3-tourism",
      TaskKind::SpeakingPart3,
      Level::Advanced,
      "Tourism and local communities",
      "How does tourism affect local communities? Should governments limit the number of tourists visiting popular places? Why do some people prefer to travel independently?",
    ),
  ]
}
