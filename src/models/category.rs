use crate::i18n::Locale;

/// A browse category with its display names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Category {
    pub id: &'static str,
    pub name_ar: &'static str,
    pub name_en: &'static str,
}

impl Category {
    pub fn name(&self, locale: Locale) -> &'static str {
        match locale {
            Locale::Ar => self.name_ar,
            Locale::En => self.name_en,
        }
    }

    pub fn find(id: &str) -> Option<&'static Category> {
        CATEGORIES.iter().find(|category| category.id == id)
    }
}

pub static CATEGORIES: [Category; 6] = [
    Category {
        id: "electronics",
        name_ar: "إلكترونيات",
        name_en: "Electronics",
    },
    Category {
        id: "furniture",
        name_ar: "أثاث",
        name_en: "Furniture",
    },
    Category {
        id: "clothing",
        name_ar: "ملابس",
        name_en: "Clothing",
    },
    Category {
        id: "vehicles",
        name_ar: "مركبات",
        name_en: "Vehicles",
    },
    Category {
        id: "toys",
        name_ar: "ألعاب",
        name_en: "Toys",
    },
    Category {
        id: "books",
        name_ar: "كتب",
        name_en: "Books",
    },
];
