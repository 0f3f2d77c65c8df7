use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use log::error;

use podpulse::catalog::{self, CategoryFilter, PodcastList};
use podpulse::comments::{self, CommentSort, CommentThread, FeedState};
use podpulse::config::Config;
use podpulse::error::Error;
use podpulse::favorites::{self, FavoriteToggle};
use podpulse::gateway::PodcastSort;
use podpulse::models::{Comment, Podcast, PodcastCategory};
use podpulse::routes::Route;
use podpulse::storage::Upload;
use podpulse::{account, admin, PodPulse};

#[derive(Parser)]
#[clap(name = "podpulse", version, about = "Browse and manage the PodPulse catalog")]
struct Cli {
    /// Account email
    #[clap(long, env = "PODPULSE_EMAIL")]
    email: Option<String>,

    /// Account password
    #[clap(long, env = "PODPULSE_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Use a throwaway in-process backend
    #[clap(long)]
    memory: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List podcasts
    List {
        #[clap(long, default_value = "")]
        query: String,
        #[clap(long)]
        category: Option<String>,
        /// date or title
        #[clap(long, default_value = "date")]
        sort: String,
    },
    /// Show one podcast
    Show { id: String },
    /// Show the comments of a podcast
    Comments {
        id: String,
        /// date or rating
        #[clap(long, default_value = "date")]
        sort: String,
        /// Keep printing snapshots as comments change
        #[clap(long)]
        follow: bool,
    },
    /// Comment on a podcast
    Comment {
        id: String,
        text: String,
        #[clap(long, default_value = "0")]
        rating: i32,
    },
    /// Like a comment
    Like { comment_id: String },
    /// Toggle a podcast in your favorites
    Favorite { podcast_id: String },
    /// List your favorites
    Favorites,
    /// Show your profile
    Profile,
    /// Create an account with the given credentials
    Register {
        #[clap(long, default_value = "")]
        name: String,
        #[clap(long)]
        age: Option<u32>,
    },
    /// Admin tools
    Admin {
        #[clap(subcommand)]
        command: AdminCommand,
    },
    /// Describe the page behind a route
    Open { route: String },
}

#[derive(Subcommand)]
enum AdminCommand {
    /// Add a podcast
    Add {
        #[clap(long)]
        title: String,
        #[clap(long)]
        description: String,
        #[clap(long)]
        category: String,
        #[clap(long)]
        audio: Option<PathBuf>,
        #[clap(long)]
        image: Option<PathBuf>,
        #[clap(long)]
        video_url: Option<String>,
    },
    /// Delete a podcast
    Delete { id: String },
    /// Make a user an admin
    Promote { uid: String },
}

fn parse_podcast_sort(value: &str) -> Result<PodcastSort, Error> {
    match value {
        "date" => Ok(PodcastSort::Date),
        "title" => Ok(PodcastSort::Title),
        other => Err(Error::validation(format!("Unknown sort: {}", other))),
    }
}

fn parse_comment_sort(value: &str) -> Result<CommentSort, Error> {
    match value {
        "date" => Ok(CommentSort::Date),
        "rating" => Ok(CommentSort::Rating),
        other => Err(Error::validation(format!("Unknown sort: {}", other))),
    }
}

fn print_podcast(podcast: &Podcast) {
    let category = podcast
        .category
        .map(|c| c.to_string())
        .unwrap_or_else(|| "-".to_string());
    println!("{}  {}  [{}]", podcast.id, podcast.title, category);
}

fn print_comments(comments: &[Comment]) {
    println!("Average rating: {:.1}", comments::average_rating(comments));
    for c in comments {
        println!("{}  {} ({}/5, {} likes): {}", c.id, c.user_name, c.rating, c.likes, c.text);
    }
}

async fn sign_in(app: &PodPulse, cli: &Cli) -> Result<(), Error> {
    if let (Some(email), Some(password)) = (&cli.email, &cli.password) {
        account::login(app, email, password).await?;
    }
    Ok(())
}

async fn run(app: &PodPulse, cli: &Cli) -> Result<(), Error> {
    match &cli.command {
        Command::Register { name, age } => {
            let form = account::RegistrationForm {
                email: cli.email.clone().unwrap_or_default(),
                password: cli.password.clone().unwrap_or_default(),
                name: name.clone(),
                age: *age,
                is_admin: None,
            };
            let identity = account::register(app, &form).await?;
            println!("Registered {}", identity.uid);
            return Ok(());
        }
        _ => sign_in(app, cli).await?,
    }

    match &cli.command {
        Command::List { query, category, sort } => {
            let mut list = PodcastList::new(CategoryFilter::from_param(category.as_deref()));
            list.set_query(query);
            list.set_sort(app, parse_podcast_sort(sort)?).await;
            if let catalog::LoadState::Failed(message) = list.state() {
                return Err(Error::general(message));
            }
            list.visible().iter().for_each(print_podcast);
        }
        Command::Show { id } => {
            let podcast = catalog::podcast_details(app, Some(id.as_str()))
                .await
                .map_err(|e| Error::general(e.to_string()))?;
            print_podcast(&podcast);
            println!("{}", podcast.description);
            let urls = [&podcast.audio_url, &podcast.video_url, &podcast.image_url];
            for url in urls.into_iter().flatten() {
                println!("  {}", url);
            }
        }
        Command::Comments { id, sort, follow } => {
            let mut thread = CommentThread::open_sorted(app, id, parse_comment_sort(sort)?);
            loop {
                match thread.settled().await? {
                    FeedState::Failed(message) => return Err(Error::general(message)),
                    _ => print_comments(&thread.comments()),
                }
                if !*follow {
                    break;
                }
                thread.next_update().await?;
            }
        }
        Command::Comment { id, text, rating } => {
            let identity = app.current_user();
            let comment_id =
                comments::submit_comment(app, identity.as_ref(), id, text, *rating).await?;
            println!("Added comment {}", comment_id);
        }
        Command::Like { comment_id } => {
            let identity = app.current_user();
            let likes = comments::like_comment(app, identity.as_ref(), comment_id).await?;
            println!("{} likes", likes);
        }
        Command::Favorite { podcast_id } => {
            let identity = app.current_user().ok_or_else(|| Error::auth("Not logged in"))?;
            let mut toggle = FavoriteToggle::load(app, &identity, podcast_id).await?;
            let now = toggle.toggle(app).await?;
            println!("{}", if now { "Added to favorites" } else { "Removed from favorites" });
        }
        Command::Favorites => {
            let identity = app.current_user().ok_or_else(|| Error::auth("Not logged in"))?;
            favorites::favorite_podcasts(app, &identity)
                .await?
                .iter()
                .for_each(print_podcast);
        }
        Command::Profile => {
            let profile = account::load_profile(app).await?;
            println!("{} <{}>", profile.name, profile.email.unwrap_or_default());
            if let Some(age) = profile.age {
                println!("Age: {}", age);
            }
            println!("Admin: {}", if profile.is_admin { "yes" } else { "no" });
        }
        Command::Admin { command } => match command {
            AdminCommand::Add {
                title,
                description,
                category,
                audio,
                image,
                video_url,
            } => {
                let category = category
                    .parse::<PodcastCategory>()
                    .map_err(Error::validation)?;
                let audio = match audio {
                    Some(path) => Some(Upload::from_path(path).await?),
                    None => None,
                };
                let image = match image {
                    Some(path) => Some(Upload::from_path(path).await?),
                    None => None,
                };
                let form = admin::NewPodcastForm {
                    title: title.clone(),
                    description: description.clone(),
                    category: Some(category),
                    video_url: video_url.clone(),
                    audio,
                    image,
                };
                let id = admin::add_podcast(app, &form).await?;
                println!("Added podcast {}", id);
            }
            AdminCommand::Delete { id } => {
                admin::delete_podcast(app, id).await?;
                println!("Deleted podcast {}", id);
            }
            AdminCommand::Promote { uid } => {
                println!("{}", admin::promote_user(app, uid).await?);
            }
        },
        Command::Open { route } => {
            let route = Route::parse(route);
            if route.requires_login() && app.current_user().is_none() {
                println!("{} requires login; redirecting to {}", route, Route::Login);
                return Ok(());
            }
            match &route {
                Route::Home => catalog::featured(app).await?.iter().for_each(print_podcast),
                Route::Podcasts { .. } => {
                    let mut list = PodcastList::new(route.category_filter());
                    list.load(app).await;
                    list.visible().iter().for_each(print_podcast);
                }
                Route::Podcast { id } => {
                    match catalog::podcast_details(app, Some(id.as_str())).await {
                        Ok(podcast) => print_podcast(&podcast),
                        Err(e) => println!("{}", e),
                    }
                }
                Route::Admin => admin::load_dashboard(app).await?.iter().for_each(print_podcast),
                Route::NotFound(path) => println!("No page at {}", path),
                other => println!("{}", other),
            }
        }
        Command::Register { .. } => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();

    let app = if cli.memory {
        PodPulse::in_memory()
    } else {
        match Config::from_env().and_then(PodPulse::connect) {
            Ok(app) => app,
            Err(e) => {
                eprintln!("{}", e);
                process::exit(2);
            }
        }
    };

    if let Err(e) = run(&app, &cli).await {
        error!("{}", e);
        let message = match &e {
            Error::Validation(_) | Error::General(_) | Error::PermissionDenied(_) => e.to_string(),
            _ => e.user_message("data"),
        };
        eprintln!("{}", message);
        process::exit(1);
    }
}
