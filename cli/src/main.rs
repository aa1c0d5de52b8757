use clap::{Parser, Subcommand};
use learnhub::model::entity::{
    Course, CourseCreate, Enrollment, Lesson, LessonCreate, Module, ModuleCreate, UserEntity,
    UserEntityCreateUpdate,
};
use learnhub::model::{CrudRepository, DatabaseError, DbConnection, ModelManager};
use learnhub::web::{AuthenticatedUser, UserRole};

#[derive(Parser, Debug)]
#[command(about = "CLI tool for filling the LearnHub catalog", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserCommands,
    },

    /// Manage courses
    Course {
        #[command(subcommand)]
        action: CourseCommands,
    },

    /// Manage modules
    Module {
        #[command(subcommand)]
        action: ModuleCommands,
    },

    /// Manage lessons
    Lesson {
        #[command(subcommand)]
        action: LessonCommands,
    },

    /// Enroll a user in a course, bypassing payment
    Enroll {
        #[arg(long)]
        email: String,
        #[arg(long)]
        course_title: String,
    },
}

/// User management
#[derive(Subcommand, Debug)]
pub enum UserCommands {
    Add {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        password: String,
        /// student, instructor or admin
        #[arg(long, default_value = "student")]
        role: String,
    },
}

/// Course management
#[derive(Subcommand, Debug)]
pub enum CourseCommands {
    Add {
        /// E-mail of the instructor who owns the course
        #[arg(long)]
        instructor_email: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value_t = 0.0)]
        price: f64,
        #[arg(long, default_value = "beginner")]
        level: String,
        #[arg(long, default_value_t = false)]
        published: bool,
    },
}

/// Module management
#[derive(Subcommand, Debug)]
pub enum ModuleCommands {
    Add {
        /// Course title to attach the module to
        #[arg(long)]
        course_title: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value_t = 0)]
        order_index: i32,
    },
}

/// Lesson management
#[derive(Subcommand, Debug)]
pub enum LessonCommands {
    Add {
        /// Module title to attach the lesson to
        #[arg(long)]
        module_title: String,
        #[arg(long)]
        title: String,
        /// Path to a Markdown file with lesson content
        #[arg(long)]
        file: String,
        /// Minutes
        #[arg(long, default_value_t = 0)]
        duration: i32,
        #[arg(long, default_value_t = 0)]
        order_index: i32,
    },
}

async fn find_id(mm: &ModelManager, sql: &str, key: &str) -> Result<uuid::Uuid, DatabaseError> {
    let id = sqlx::query_scalar(sql)
        .bind(key)
        .fetch_one(mm.executor())
        .await?;
    Ok(id)
}

#[tokio::main]
async fn main() -> learnhub::error::AppResult<()> {
    let _ = dotenvy::dotenv();
    let args = Cli::parse();

    let database_uri = match std::env::var("DATABASE_URL") {
        Ok(uri) => uri,
        Err(_) => learnhub::Config::get_or_init(false)
            .await
            .app()
            .database_uri()
            .to_string(),
    };

    let db_con = DbConnection::connect(&database_uri)?;
    let mm = ModelManager::new(db_con);
    let admin = AuthenticatedUser::admin();

    match args.command {
        Commands::User { action } => match action {
            UserCommands::Add {
                email,
                name,
                password,
                role,
            } => {
                let user = UserEntity::create(
                    &mm,
                    &admin,
                    UserEntityCreateUpdate {
                        email,
                        name,
                        password_hash: learnhub::auth::hash_password(&password)?,
                    },
                )
                .await?;

                let user = match UserRole::from(role.as_str()) {
                    UserRole::Student => user,
                    role => user.set_role(&mm, &admin, role).await?,
                };
                println!("User created: {:?}", user);
            }
        },

        Commands::Course { action } => match action {
            CourseCommands::Add {
                instructor_email,
                title,
                description,
                price,
                level,
                published,
            } => {
                let instructor = UserEntity::find_by_email(&mm, &admin, &instructor_email)
                    .await?
                    .ok_or(DatabaseError::NotFound)?;
                let actor = AuthenticatedUser::new(instructor.id(), instructor.role());

                let course = Course::create(
                    &mm,
                    &actor,
                    CourseCreate {
                        title,
                        description,
                        price: Some(price),
                        level: Some(level),
                        published: Some(published),
                    },
                )
                .await?;
                println!("Course created: {:?}", course);
            }
        },

        Commands::Module { action } => match action {
            ModuleCommands::Add {
                course_title,
                title,
                description,
                order_index,
            } => {
                let course_id =
                    find_id(&mm, "SELECT id FROM courses WHERE title = $1", &course_title).await?;

                let module = Module::create(
                    &mm,
                    &admin,
                    ModuleCreate {
                        course_id,
                        title,
                        description,
                        order_index: Some(order_index),
                    },
                )
                .await?;
                println!("Module created: {:?}", module);
            }
        },

        Commands::Lesson { action } => match action {
            LessonCommands::Add {
                module_title,
                title,
                file,
                duration,
                order_index,
            } => {
                let module_id =
                    find_id(&mm, "SELECT id FROM modules WHERE title = $1", &module_title).await?;

                let content = std::fs::read_to_string(file)?;
                let lesson = Lesson::create(
                    &mm,
                    &admin,
                    LessonCreate {
                        module_id,
                        title,
                        content,
                        duration: Some(duration),
                        order_index: Some(order_index),
                    },
                )
                .await?;
                println!("Lesson created: {:?}", lesson);
            }
        },

        Commands::Enroll {
            email,
            course_title,
        } => {
            let user_id = find_id(&mm, "SELECT id FROM users WHERE email = $1", &email.to_lowercase()).await?;
            let course_id =
                find_id(&mm, "SELECT id FROM courses WHERE title = $1", &course_title).await?;

            let mut tx = mm.begin().await?;
            let enrollment = Enrollment::create_in(&mut tx, user_id, course_id, None).await?;
            tx.commit().await.map_err(DatabaseError::from)?;
            println!("Enrollment created: {:?}", enrollment);
        }
    }

    Ok(())
}
