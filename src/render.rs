//! Plain-text rendering of screen state for the terminal.

use chrono::Utc;
use std::fmt::Write;

use crate::i18n::{condition_label, format_price, status_label, time_ago, Locale, Text};
use crate::models::{Category, ChatMessage, Listing, Sender, CATEGORIES};
use crate::notify::{Toast, ToastVariant};
use crate::screens::{format_time, ListingDetail, NotFoundView, ProfileView};

/// App title and the category chips, the selected one in brackets.
pub fn header(selected: Option<&str>, locale: Locale) -> String {
    let chip = |label: &str, active: bool| {
        if active {
            format!("[{label}]")
        } else {
            label.to_string()
        }
    };
    let mut chips = vec![chip(Text::All.get(locale), selected.is_none())];
    chips.extend(
        CATEGORIES
            .iter()
            .map(|category| chip(category.name(locale), selected == Some(category.id))),
    );
    format!("{}\n{}\n\n", Text::AppName.get(locale), chips.join(" | "))
}

/// One entry of a listing grid: `1. name (price)` plus location and age.
pub fn card(index: usize, listing: &Listing, locale: Locale) -> String {
    let mut out = format!("{}. {} ({})\n", index + 1, listing.name, format_price(listing.price));
    let _ = writeln!(
        out,
        "   {} · {} · {}",
        listing.location,
        condition_label(listing.condition, locale),
        time_ago(listing.created_at, Utc::now(), locale)
    );
    if let Some(name) = listing
        .category
        .as_deref()
        .and_then(Category::find)
        .map(|category| category.name(locale))
    {
        let _ = writeln!(out, "   {name}");
    }
    if !listing.is_available() {
        let _ = writeln!(out, "   [{}]", status_label(listing.status, locale));
    }
    let _ = writeln!(out, "   ID: {}", listing.id);
    out
}

pub fn cards(listings: &[Listing], empty: Text, locale: Locale) -> String {
    if listings.is_empty() {
        return format!("{}\n", empty.get(locale));
    }
    listings
        .iter()
        .enumerate()
        .map(|(i, listing)| card(i, listing, locale))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn detail(detail: &ListingDetail, locale: Locale) -> String {
    let listing = &detail.listing;
    let mut out = format!("{}\n{}\n", listing.name, detail.price);
    let _ = writeln!(out, "{} · {}", detail.condition, listing.location);
    let _ = writeln!(
        out,
        "{} {} · {} {}",
        Text::Posted.get(locale),
        detail.posted,
        listing.views,
        Text::Views.get(locale)
    );
    let _ = writeln!(out, "{}", detail.image);
    let _ = writeln!(out, "\n{}\n", detail.description);
    if let Some(phone) = &detail.phone {
        let _ = writeln!(out, "☎ {phone}");
    }
    let _ = writeln!(out, "{}: {}", Text::Message.get(locale), detail.chat);
    out
}

pub fn profile(view: &ProfileView, locale: Locale) -> String {
    match view {
        ProfileView::Guest => format!(
            "{}\n{}: /login\n",
            Text::Guest.get(locale),
            Text::LoginRequiredHint.get(locale)
        ),
        ProfileView::Member(card) => {
            let mut out = format!("({}) {}\n{}\n", card.initial, card.name, card.email);
            for value in [&card.phone, &card.location].into_iter().flatten() {
                let _ = writeln!(out, "{value}");
            }
            let _ = writeln!(out, "{} {}", Text::MemberSince.get(locale), card.member_since);
            out
        }
    }
}

pub fn not_found(view: &NotFoundView) -> String {
    format!("404\n{}\n{}\n{}: {}\n", view.title, view.hint, view.home_label, view.home)
}

pub fn chat_message(message: &ChatMessage) -> String {
    let who = match message.sender {
        Sender::Buyer => ">",
        Sender::Seller => "<",
    };
    format!("{who} [{}] {}", format_time(message.timestamp), message.text)
}

pub fn toast(toast: &Toast) -> String {
    let marker = match toast.variant {
        ToastVariant::Default => "✅",
        ToastVariant::Destructive => "❌",
    };
    match &toast.description {
        Some(description) => format!("{marker} {}: {description}", toast.title),
        None => format!("{marker} {}", toast.title),
    }
}
