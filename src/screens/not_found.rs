use tracing::error;

use crate::i18n::{Locale, Text};
use crate::routes::Route;

/// 404 page for an unknown path
#[derive(Debug, Clone, PartialEq)]
pub struct NotFoundView {
    pub path: String,
    pub title: &'static str,
    pub hint: &'static str,
    pub home_label: &'static str,
    pub home: Route,
}

impl NotFoundView {
    pub fn new(path: &str, locale: Locale) -> Self {
        error!(path, "404 Error: User attempted to access non-existent route");
        Self {
            path: path.to_string(),
            title: Text::PageNotFound.get(locale),
            hint: Text::PageNotFoundHint.get(locale),
            home_label: Text::BackHome.get(locale),
            home: Route::Home,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_back_home() {
        let view = NotFoundView::new("/nowhere", Locale::Ar);
        assert_eq!(view.home, Route::Home);
        assert_eq!(view.title, "عذراً! الصفحة غير موجودة");
        assert_eq!(view.path, "/nowhere");
    }
}
