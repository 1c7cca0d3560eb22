use std::collections::HashMap;

/// Question for the password of the client principal.
pub const QUESTION_PASSWORD: &str = "password";

/// Question for the response of a SAM-2 challenge.
pub const QUESTION_SAM2: &str = "sam2";

#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub name: String,

    /// Text which helps to answer the question, like a token challenge.
    pub challenge: Option<String>,
}

/// Questions that the exchange needs answered to continue.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Questions {
    items: Vec<Question>,
}

impl Questions {
    pub fn new() -> Self {
        return Self::default();
    }

    /// Adds a question. Asking the same question again just updates the
    /// challenge.
    pub fn ask(&mut self, name: &str, challenge: Option<String>) {
        match self.items.iter_mut().find(|q| q.name == name) {
            Some(question) => question.challenge = challenge,
            None => self.items.push(Question {
                name: name.to_string(),
                challenge,
            }),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Question> {
        return self.items.iter().find(|q| q.name == name);
    }

    pub fn contains(&self, name: &str) -> bool {
        return self.get(name).is_some();
    }

    pub fn iter(&self) -> std::slice::Iter<Question> {
        return self.items.iter();
    }

    pub fn is_empty(&self) -> bool {
        return self.items.is_empty();
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Answers {
    values: HashMap<String, String>,
}

impl Answers {
    pub fn new() -> Self {
        return Self::default();
    }

    pub fn set(&mut self, name: &str, value: &str) {
        self.values.insert(name.to_string(), value.to_string());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        return self.values.get(name).map(|v| v.as_str());
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        return self.values.remove(name);
    }

    /// Whether every question has an answer
    pub fn answer_all(&self, questions: &Questions) -> bool {
        return questions.iter().all(|q| self.values.contains_key(&q.name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ask_twice_keeps_one_question() {
        let mut questions = Questions::new();
        questions.ask(QUESTION_SAM2, None);
        questions.ask(QUESTION_SAM2, Some("Enter token".into()));
        assert_eq!(1, questions.iter().count());
        assert_eq!(
            Some("Enter token".to_string()),
            questions.get(QUESTION_SAM2).unwrap().challenge
        );
    }

    #[test]
    fn test_answer_all() {
        let mut questions = Questions::new();
        questions.ask(QUESTION_PASSWORD, None);
        let mut answers = Answers::new();
        assert!(!answers.answer_all(&questions));
        answers.set(QUESTION_PASSWORD, "secret");
        assert!(answers.answer_all(&questions));
    }
}
