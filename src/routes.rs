//! Client routes

use std::fmt;

use url::{form_urlencoded, Url};

use crate::catalog::CategoryFilter;

/// A navigable page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    /// The catalog, optionally opened on a category
    Podcasts { category: Option<String> },
    Podcast { id: String },
    Login,
    Register,
    Admin,
    Favorites,
    Profile,
    NotFound(String),
}

impl Route {
    /// Map a path, with optional query string, to its route
    pub fn parse(path: &str) -> Route {
        let base = match Url::parse("http://podpulse.local/") {
            Ok(base) => base,
            Err(_) => return Route::NotFound(path.to_string()),
        };
        let url = match base.join(path) {
            Ok(url) => url,
            Err(_) => return Route::NotFound(path.to_string()),
        };

        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        match segments.as_slice() {
            [] => Route::Home,
            ["podcasts"] => Route::Podcasts {
                category: url
                    .query_pairs()
                    .find(|(k, _)| k == "category")
                    .map(|(_, v)| v.into_owned()),
            },
            ["podcast", id] => Route::Podcast {
                id: percent_decode(id),
            },
            ["login"] => Route::Login,
            ["register"] => Route::Register,
            ["admin"] => Route::Admin,
            ["favorites"] => Route::Favorites,
            ["profile"] => Route::Profile,
            _ => Route::NotFound(url.path().to_string()),
        }
    }

    /// Render the route back to a path
    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Podcasts { category: None } => "/podcasts".to_string(),
            Route::Podcasts {
                category: Some(category),
            } => {
                let query = form_urlencoded::Serializer::new(String::new())
                    .append_pair("category", category)
                    .finish();
                format!("/podcasts?{}", query)
            }
            Route::Podcast { id } => format!("/podcast/{}", id),
            Route::Login => "/login".to_string(),
            Route::Register => "/register".to_string(),
            Route::Admin => "/admin".to_string(),
            Route::Favorites => "/favorites".to_string(),
            Route::Profile => "/profile".to_string(),
            Route::NotFound(path) => path.clone(),
        }
    }

    /// Pages that need a signed-in user
    pub fn requires_login(&self) -> bool {
        matches!(self, Route::Admin | Route::Favorites | Route::Profile)
    }

    /// Initial catalog filter for a catalog route
    pub fn category_filter(&self) -> CategoryFilter {
        match self {
            Route::Podcasts { category } => CategoryFilter::from_param(category.as_deref()),
            _ => CategoryFilter::All,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

fn percent_decode(segment: &str) -> String {
    // path segments share the percent-encoding of form values, minus '+'
    let escaped = segment.replace('+', "%2B");
    form_urlencoded::parse(format!("v={}", escaped).as_bytes())
        .next()
        .map(|(_, v)| v.into_owned())
        .unwrap_or_else(|| segment.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PodcastCategory;

    #[test]
    fn parses_every_page() {
        assert_eq!(Route::parse("/"), Route::Home);
        assert_eq!(Route::parse("/podcasts"), Route::Podcasts { category: None });
        assert_eq!(
            Route::parse("/podcast/abc123"),
            Route::Podcast { id: "abc123".to_string() }
        );
        assert_eq!(Route::parse("/login"), Route::Login);
        assert_eq!(Route::parse("/register"), Route::Register);
        assert_eq!(Route::parse("/admin"), Route::Admin);
        assert_eq!(Route::parse("/favorites"), Route::Favorites);
        assert_eq!(Route::parse("/profile/"), Route::Profile);
        assert_eq!(Route::parse("/nowhere"), Route::NotFound("/nowhere".to_string()));
    }

    #[test]
    fn category_parameter_round_trips() {
        let route = Route::Podcasts {
            category: Some("TV & Film".to_string()),
        };
        assert_eq!(route.path(), "/podcasts?category=TV+%26+Film");
        assert_eq!(Route::parse(&route.path()), route);
        assert_eq!(
            route.category_filter(),
            CategoryFilter::Only(PodcastCategory::TvAndFilm)
        );

        let unknown = Route::parse("/podcasts?category=Cooking");
        assert_eq!(unknown.category_filter(), CategoryFilter::All);
    }

    #[test]
    fn protected_pages() {
        assert!(Route::Admin.requires_login());
        assert!(!Route::Home.requires_login());
    }
}
