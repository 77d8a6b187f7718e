use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::models::{lesson::Lesson, quiz::Quiz};

/// Insertion-ordered map that drops its oldest entry once full.
struct BoundedMap<V> {
    capacity: usize,
    entries: HashMap<String, Arc<V>>,
    order: VecDeque<String>,
}

impl<V> BoundedMap<V> {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn insert(&mut self, id: String, value: Arc<V>) {
        if self.entries.insert(id.clone(), value).is_some() {
            return;
        }
        self.order.push_back(id);

        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }

    fn get(&self, id: &str) -> Option<Arc<V>> {
        self.entries.get(id).cloned()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Generated lessons and quizzes, kept so later requests can refer to them by id.
pub struct ContentCache {
    lessons: RwLock<BoundedMap<Lesson>>,
    quizzes: RwLock<BoundedMap<Quiz>>,
}

impl ContentCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            lessons: RwLock::new(BoundedMap::new(capacity)),
            quizzes: RwLock::new(BoundedMap::new(capacity)),
        }
    }

    pub async fn put_lesson(&self, lesson: Lesson) -> Arc<Lesson> {
        let lesson = Arc::new(lesson);
        self.lessons
            .write()
            .await
            .insert(lesson.id.clone(), lesson.clone());
        lesson
    }

    pub async fn lesson(&self, id: &str) -> Option<Arc<Lesson>> {
        self.lessons.read().await.get(id)
    }

    pub async fn put_quiz(&self, quiz: Quiz) -> Arc<Quiz> {
        let quiz = Arc::new(quiz);
        self.quizzes
            .write()
            .await
            .insert(quiz.id.clone(), quiz.clone());
        quiz
    }

    pub async fn quiz(&self, id: &str) -> Option<Arc<Quiz>> {
        self.quizzes.read().await.get(id)
    }

    pub async fn sizes(&self) -> (usize, usize) {
        (
            self.lessons.read().await.len(),
            self.quizzes.read().await.len(),
        )
    }
}
