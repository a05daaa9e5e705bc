//! Arabic and English strings for everything the screens show.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Condition, ListingStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Ar,
    En,
}

impl std::str::FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ar" | "ar-sy" => Ok(Locale::Ar),
            "en" | "en-us" | "en-gb" => Ok(Locale::En),
            other => Err(format!("unsupported locale `{other}`")),
        }
    }
}

/// Fixed user-facing strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Text {
    AppName,
    All,
    LoadListingsFailed,
    LoadDetailsFailed,
    LoadDetailsFailedHint,
    NewListing,
    ListingCreated,
    ListingCreatedHint,
    ListingCreateFailed,
    RequiredField,
    InvalidValue,
    LoginRequired,
    LoginRequiredHint,
    SignedIn,
    SignedInHint,
    SignInFailed,
    Registered,
    RegisteredHint,
    RegisterFailed,
    PasswordMismatch,
    SignedOut,
    SignOutFailed,
    ListingDeleted,
    ListingSold,
    UpdateFailed,
    SearchFailed,
    NoResults,
    ListingNotFound,
    BackHome,
    BackToListing,
    PageNotFound,
    PageNotFoundHint,
    NoDescription,
    Guest,
    MemberSince,
    NoListings,
    Posted,
    Views,
    Message,
}

impl Text {
    pub fn get(self, locale: Locale) -> &'static str {
        let (ar, en) = match self {
            Text::AppName => ("سوق سوريا", "Syria Sooq"),
            Text::All => ("الكل", "All"),
            Text::LoadListingsFailed => ("خطأ في تحميل المنتجات", "Failed to load listings"),
            Text::LoadDetailsFailed => {
                ("خطأ في تحميل تفاصيل المنتج", "Failed to load product details")
            }
            Text::LoadDetailsFailedHint => (
                "لم نتمكن من تحميل تفاصيل المنتج. يرجى المحاولة مرة أخرى.",
                "We couldn't load the product details. Please try again.",
            ),
            Text::NewListing => ("منتج جديد", "New listing"),
            Text::ListingCreated => ("تمت إضافة المنتج بنجاح", "Product added successfully"),
            Text::ListingCreatedHint => (
                "تم عرض منتجك في سوق سوريا!",
                "Your product has been listed on Syria Sooq!",
            ),
            Text::ListingCreateFailed => ("تعذر إضافة المنتج", "Couldn't add the product"),
            Text::RequiredField => ("حقل مطلوب", "Required field"),
            Text::InvalidValue => ("قيمة غير صالحة", "Invalid value"),
            Text::LoginRequired => ("يجب تسجيل الدخول", "Sign-in required"),
            Text::LoginRequiredHint => (
                "يرجى تسجيل الدخول للمتابعة",
                "Please sign in to continue.",
            ),
            Text::SignedIn => ("تم تسجيل الدخول بنجاح", "Signed in successfully"),
            Text::SignedInHint => (
                "مرحباً بك مجدداً في سوق سوريا!",
                "Welcome back to Syria Sooq!",
            ),
            Text::SignInFailed => ("فشل تسجيل الدخول", "Sign-in failed"),
            Text::Registered => ("تم إنشاء الحساب بنجاح", "Registration successful"),
            Text::RegisteredHint => (
                "يرجى التحقق من بريدك الإلكتروني لتفعيل حسابك.",
                "Please check your email to verify your account.",
            ),
            Text::RegisterFailed => ("فشل إنشاء الحساب", "Registration failed"),
            Text::PasswordMismatch => ("كلمتا المرور غير متطابقتين", "Passwords do not match"),
            Text::SignedOut => ("تم تسجيل الخروج", "Signed out"),
            Text::SignOutFailed => ("تعذر تسجيل الخروج", "Couldn't sign out"),
            Text::ListingDeleted => ("تم حذف المنتج", "Listing deleted"),
            Text::ListingSold => ("تم تحديد المنتج كمباع", "Listing marked as sold"),
            Text::UpdateFailed => ("تعذر تحديث المنتج", "Couldn't update the listing"),
            Text::SearchFailed => ("تعذر إجراء البحث", "Search failed"),
            Text::NoResults => (
                "لم يتم العثور على منتجات تطابق بحثك",
                "No products match your search",
            ),
            Text::ListingNotFound => ("المنتج غير موجود", "Product not found"),
            Text::BackHome => ("العودة إلى الرئيسية", "Return to home"),
            Text::BackToListing => ("العودة إلى المنتج", "Back to the product"),
            Text::PageNotFound => ("عذراً! الصفحة غير موجودة", "Oops! Page not found"),
            Text::PageNotFoundHint => (
                "ربما تمت إزالة الصفحة التي تبحث عنها أو تغيير اسمها أو أنها غير متاحة مؤقتاً.",
                "The page you are looking for might have been removed, had its name changed, or is temporarily unavailable.",
            ),
            Text::NoDescription => ("لا يوجد وصف للمنتج", "No description provided"),
            Text::Guest => ("زائر", "Guest"),
            Text::MemberSince => ("عضو منذ", "Member since"),
            Text::NoListings => (
                "ليس لديك منتجات معروضة للبيع",
                "You have no listings for sale",
            ),
            Text::Posted => ("نُشر", "Posted"),
            Text::Views => ("مشاهدة", "views"),
            Text::Message => ("مراسلة", "Message"),
        };
        match locale {
            Locale::Ar => ar,
            Locale::En => en,
        }
    }
}

/// Display name of a form field, used in validation toasts.
pub fn field_label(field: &str, locale: Locale) -> &str {
    let (ar, en) = match field {
        "name" => ("اسم المنتج", "Product name"),
        "price" => ("السعر", "Price"),
        "location" => ("الموقع", "Location"),
        "email" => ("البريد الإلكتروني", "Email"),
        "password" => ("كلمة المرور", "Password"),
        "confirm_password" => ("تأكيد كلمة المرور", "Confirm password"),
        "full_name" => ("الاسم الكامل", "Full name"),
        "username" => ("اسم المستخدم", "Username"),
        _ => return field,
    };
    match locale {
        Locale::Ar => ar,
        Locale::En => en,
    }
}

pub fn condition_label(condition: Condition, locale: Locale) -> &'static str {
    match (condition, locale) {
        (Condition::New, Locale::Ar) => "جديد",
        (Condition::Used, Locale::Ar) => "مستعمل",
        (Condition::New, Locale::En) => "New",
        (Condition::Used, Locale::En) => "Used",
    }
}

pub fn status_label(status: ListingStatus, locale: Locale) -> &'static str {
    match (status, locale) {
        (ListingStatus::Available, Locale::Ar) => "متاح",
        (ListingStatus::Sold, Locale::Ar) => "تم البيع",
        (ListingStatus::Deleted, Locale::Ar) => "محذوف",
        (ListingStatus::Available, Locale::En) => "Available",
        (ListingStatus::Sold, Locale::En) => "Sold",
        (ListingStatus::Deleted, Locale::En) => "Deleted",
    }
}

/// Relative age of a timestamp ("منذ 3 ساعة" / "3 hours ago").
///
/// Months are 30 days and years 12 months; future timestamps read as "just now".
pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>, locale: Locale) -> String {
    let seconds = (now - then).num_seconds();
    if seconds < 60 {
        return match locale {
            Locale::Ar => "منذ لحظات".to_string(),
            Locale::En => "just now".to_string(),
        };
    }

    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;
    let months = days / 30;
    let years = months / 12;

    let (count, ar_unit, en_unit) = if minutes < 60 {
        (minutes, "دقيقة", "minute")
    } else if hours < 24 {
        (hours, "ساعة", "hour")
    } else if days < 30 {
        (days, "يوم", "day")
    } else if months < 12 {
        (months, "شهر", "month")
    } else {
        (years, "سنة", "year")
    };

    match locale {
        Locale::Ar => format!("منذ {count} {ar_unit}"),
        Locale::En if count == 1 => format!("1 {en_unit} ago"),
        Locale::En => format!("{count} {en_unit}s ago"),
    }
}

/// Levantine month name and year: "آذار 2023" / "March 2023"
pub fn month_year(date: DateTime<Utc>, locale: Locale) -> String {
    const AR: [&str; 12] = [
        "كانون الثاني", "شباط", "آذار", "نيسان", "أيار", "حزيران",
        "تموز", "آب", "أيلول", "تشرين الأول", "تشرين الثاني", "كانون الأول",
    ];
    const EN: [&str; 12] = [
        "January", "February", "March", "April", "May", "June",
        "July", "August", "September", "October", "November", "December",
    ];
    let index = date.month0() as usize;
    let month = match locale {
        Locale::Ar => AR[index],
        Locale::En => EN[index],
    };
    format!("{month} {}", date.year())
}

/// Price as rendered on cards: two decimals and a dollar sign.
pub fn format_price(price: f64) -> String {
    format!("{price:.2} $")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn time_ago_buckets_in_arabic() {
        let now = now();
        assert_eq!(time_ago(now - Duration::seconds(30), now, Locale::Ar), "منذ لحظات");
        assert_eq!(time_ago(now - Duration::minutes(5), now, Locale::Ar), "منذ 5 دقيقة");
        assert_eq!(time_ago(now - Duration::hours(3), now, Locale::Ar), "منذ 3 ساعة");
        assert_eq!(time_ago(now - Duration::days(2), now, Locale::Ar), "منذ 2 يوم");
        assert_eq!(time_ago(now - Duration::days(65), now, Locale::Ar), "منذ 2 شهر");
        assert_eq!(time_ago(now - Duration::days(800), now, Locale::Ar), "منذ 2 سنة");
    }

    #[test]
    fn time_ago_pluralises_english() {
        let now = now();
        assert_eq!(time_ago(now - Duration::minutes(1), now, Locale::En), "1 minute ago");
        assert_eq!(time_ago(now - Duration::hours(5), now, Locale::En), "5 hours ago");
        assert_eq!(time_ago(now + Duration::hours(1), now, Locale::En), "just now");
    }

    #[test]
    fn field_labels_fall_back_to_the_key() {
        assert_eq!(field_label("price", Locale::En), "Price");
        assert_eq!(field_label("price", Locale::Ar), "السعر");
        assert_eq!(field_label("mystery", Locale::Ar), "mystery");
    }

    #[test]
    fn month_year_uses_levantine_month_names() {
        let date = Utc.with_ymd_and_hms(2023, 3, 14, 0, 0, 0).unwrap();
        assert_eq!(month_year(date, Locale::Ar), "آذار 2023");
        assert_eq!(month_year(date, Locale::En), "March 2023");
    }

    #[test]
    fn prices_render_with_two_decimals() {
        assert_eq!(format_price(79.99), "79.99 $");
        assert_eq!(format_price(1299.0), "1299.00 $");
    }
}
