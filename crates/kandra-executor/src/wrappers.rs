/// Stack families the smart wrappers recognize, matched by case-insensitive
/// substring against the plan's `target_stack` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackFamily {
    Python,
    Ruby,
    JavaSpring,
    RustGo,
    Other,
}

pub fn detect_stack_family(target_stack: &str) -> StackFamily {
    let s = target_stack.to_lowercase();
    if ["python", "django", "flask", "fastapi"].iter().any(|k| s.contains(k)) {
        StackFamily::Python
    } else if ["ruby", "rails", "sinatra"].iter().any(|k| s.contains(k)) {
        StackFamily::Ruby
    } else if ["java", "spring", "kotlin"].iter().any(|k| s.contains(k)) {
        StackFamily::JavaSpring
    } else if ["rust", "cargo", "go", "golang"].iter().any(|k| s.contains(k)) {
        StackFamily::RustGo
    } else {
        StackFamily::Other
    }
}

/// Rewrite a raw agent command before it reaches the shell tool, e.g.
/// `pip install x` -> `./.venv/bin/pip install x`. `target_has` checks for
/// the presence of a file relative to `target/` (used for the `mvnw`/
/// `gradlew` wrapper-script checks); pass a closure over real `Path::exists`
/// in production, a fixture in tests.
pub fn rewrite_command(command: &str, family: StackFamily, target_has: &dyn Fn(&str) -> bool) -> String {
    let trimmed = command.trim_start();
    match family {
        StackFamily::Python => {
            if starts_with_word(trimmed, "pip") {
                return format!("./.venv/bin/{trimmed}");
            }
            if starts_with_word(trimmed, "python3") {
                return format!("./.venv/bin/python{}", &trimmed["python3".len()..]);
            }
            if starts_with_word(trimmed, "python") {
                return format!("./.venv/bin/{trimmed}");
            }
            if starts_with_word(trimmed, "pytest") {
                return format!("./.venv/bin/{trimmed}");
            }
            command.to_string()
        }
        StackFamily::Ruby => {
            for verb in ["gem", "rake", "rails"] {
                if starts_with_word(trimmed, verb) {
                    return format!("bundle exec {trimmed}");
                }
            }
            command.to_string()
        }
        StackFamily::JavaSpring => {
            if starts_with_word(trimmed, "mvn") && target_has("mvnw") {
                return format!("./mvnw{}", &trimmed["mvn".len()..]);
            }
            if starts_with_word(trimmed, "gradle") && target_has("gradlew") {
                return format!("./gradlew{}", &trimmed["gradle".len()..]);
            }
            command.to_string()
        }
        StackFamily::RustGo | StackFamily::Other => command.to_string(),
    }
}

fn starts_with_word(s: &str, word: &str) -> bool {
    s == word || s.starts_with(&format!("{word} "))
}
