// src/seed.rs

//! Startup data: the sample exam catalog and the optional admin account.

use crate::{
    config::Config,
    error::AppError,
    models::{
        exam::{Level, NewExam, Question, QuestionOption},
        user::{NewUser, ROLE_ADMIN},
    },
    store::Repository,
    utils::hash::hash_password,
};

fn q(id: &str, text: &str, options: [&str; 4], correct: &str, category: &str) -> Question {
    Question {
        id: id.to_string(),
        text: text.to_string(),
        options: ["a", "b", "c", "d"]
            .iter()
            .zip(options)
            .map(|(id, text)| QuestionOption {
                id: id.to_string(),
                text: text.to_string(),
            })
            .collect(),
        correct_option_id: correct.to_string(),
        category: Some(category.to_string()),
    }
}

pub fn sample_exams() -> Vec<NewExam> {
    vec![
        NewExam {
            title: "Spanish: Basic Vocabulary".into(),
            language: "Spanish".into(),
            level: Level::Beginner,
            description: "Test your knowledge of essential Spanish vocabulary for everyday conversations.".into(),
            time_limit: 15,
            questions: vec![
                q("q1", "What is the Spanish word for 'book'?", ["Libro", "Mesa", "Pluma", "Puerta"], "a", "vocabulary"),
                q("q2", "How do you say 'goodbye' in Spanish?", ["Hola", "Gracias", "Adiós", "Buenos días"], "c", "vocabulary"),
                q("q3", "Which word means 'water' in Spanish?", ["Pan", "Agua", "Vino", "Leche"], "b", "vocabulary"),
            ],
        },
        NewExam {
            title: "French: Common Phrases".into(),
            language: "French".into(),
            level: Level::Beginner,
            description: "Learn essential French phrases for travelers and everyday situations.".into(),
            time_limit: 10,
            questions: vec![
                q("q1", "How do you say 'Hello' in French?", ["Bonjour", "Merci", "Au revoir", "S'il vous plaît"], "a", "phrases"),
                q("q2", "What is the French phrase for 'How are you?'", ["Je m'appelle", "Comment allez-vous?", "Je ne sais pas", "Où est...?"], "b", "phrases"),
            ],
        },
        NewExam {
            title: "German: Grammar Basics".into(),
            language: "German".into(),
            level: Level::Beginner,
            description: "Master the fundamentals of German grammar with this comprehensive test.".into(),
            time_limit: 20,
            questions: vec![
                q("q1", "What is the correct definite article for 'book' in German?", ["der", "die", "das", "dem"], "c", "grammar"),
                q("q2", "Which form of 'to be' is correct for 'I am' in German?", ["bin", "ist", "sind", "seid"], "a", "grammar"),
            ],
        },
    ]
}

/// Loads the sample catalog. Returns the number of exams created.
pub async fn seed_exams(store: &dyn Repository) -> Result<usize, AppError> {
    let exams = sample_exams();
    let count = exams.len();
    for exam in exams {
        store.create_exam(exam).await?;
    }
    tracing::info!("Seeded {} sample exams", count);
    Ok(count)
}

/// Creates the admin account from `ADMIN_USERNAME`/`ADMIN_PASSWORD` if both are
/// set and the username is free.
pub async fn seed_admin_user(store: &dyn Repository, config: &Config) -> Result<(), AppError> {
    let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) else {
        return Ok(());
    };

    if store.get_user_by_username(username).await?.is_some() {
        return Ok(());
    }

    tracing::info!("Seeding admin user: {}", username);
    let email = config
        .admin_email
        .clone()
        .unwrap_or_else(|| format!("{}@localhost", username));

    store
        .create_user(NewUser {
            username: username.clone(),
            password: hash_password(password)?,
            name: "Administrator".to_string(),
            email,
            role: ROLE_ADMIN.to_string(),
        })
        .await?;
    tracing::info!("Admin user created successfully.");
    Ok(())
}
