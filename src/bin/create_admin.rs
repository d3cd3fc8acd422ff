use ai_todo::session::is_valid_email;
use bcrypt::{hash, DEFAULT_COST};
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use std::io::{self, Write};

fn prompt(label: &str) -> io::Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn read_secret(label: &str) -> io::Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    rpassword::read_password()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("AI To-Do - Create admin account");
    println!("===============================");

    dotenv().ok();

    let database_url = std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set in .env file")?;
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await?;

    // The server migrates on startup, but this may run first
    sqlx::migrate!("./migrations").run(&pool).await?;

    let email = prompt("Email address: ")?.to_lowercase();
    if !is_valid_email(&email) {
        eprintln!("Invalid email address");
        return Ok(());
    }

    let existing: Option<(i32, String)> = sqlx::query_as("SELECT id, role FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&pool)
        .await?;

    // Existing accounts keep their password; only the role changes
    if let Some((id, role)) = existing {
        if role == "admin" {
            println!("{} (ID {}) is already an admin. Nothing to do.", email, id);
        } else {
            sqlx::query("UPDATE users SET role = 'admin', updated_at = NOW() WHERE id = $1")
                .bind(id)
                .execute(&pool)
                .await?;
            println!();
            println!("Promoted existing account to admin");
            println!("   ID: {}", id);
            println!("   Email: {}", email);
            println!("The password is unchanged.");
        }
        pool.close().await;
        return Ok(());
    }

    let name = prompt("Name (optional): ")?;
    let name = if name.is_empty() { None } else { Some(name) };

    let password = read_secret("Password: ")?;
    if password.len() < 6 {
        eprintln!("Password must be at least 6 characters long");
        return Ok(());
    }
    if password != read_secret("Password (again): ")? {
        eprintln!("Passwords don't match");
        return Ok(());
    }

    let password_hash = hash(&password, DEFAULT_COST)?;

    let id: i32 = sqlx::query_scalar(
        "INSERT INTO users (email, name, password_hash, role, created_at, updated_at)
         VALUES ($1, $2, $3, 'admin', NOW(), NOW())
         RETURNING id",
    )
    .bind(&email)
    .bind(&name)
    .bind(&password_hash)
    .fetch_one(&pool)
    .await?;

    println!();
    println!("Created admin account");
    println!("   ID: {}", id);
    println!("   Email: {}", email);
    println!("Sign in and you will land on /admin.");

    pool.close().await;
    Ok(())
}
