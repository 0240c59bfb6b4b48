//! Reservation history as a downloadable PDF.

use chrono::{DateTime, Utc};
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};

use crate::errors::{ServiceError, ServiceResult};
use crate::services::db_models::{ReservationView, User};
use crate::types::format_cents;

const PAGE_WIDTH: Mm = Mm(210.0);
const PAGE_HEIGHT: Mm = Mm(297.0);
const MARGIN: f32 = 20.0;
const LINE_HEIGHT: f32 = 6.0;
const LAYER: &str = "Layer 1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLine {
    pub date: String,
    pub meal: String,
    pub dish: String,
    pub quantity: i32,
    pub supplements: String,
    pub status: String,
    pub total_cents: i64,
}

impl ReportLine {
    fn render(&self) -> String {
        format!(
            "{} {} | {} x{} | {} | {} | {}",
            self.date,
            self.meal,
            self.dish,
            self.quantity,
            self.supplements,
            self.status,
            format_cents(self.total_cents)
        )
    }
}

#[derive(Debug, Clone)]
pub struct ReservationReport {
    pub owner: String,
    pub generated_at: DateTime<Utc>,
    pub lines: Vec<ReportLine>,
}

impl ReservationReport {
    pub fn build(owner: &User, reservations: &[ReservationView], generated_at: DateTime<Utc>) -> Self {
        let lines = reservations
            .iter()
            .map(|view| {
                let supplements = if view.supplements.is_empty() {
                    "-".to_owned()
                } else {
                    view.supplements.iter().map(|s| s.name.as_str()).collect::<Vec<_>>().join(", ")
                };
                ReportLine {
                    date: view.slot.date.to_string(),
                    meal: view.slot.meal.to_string(),
                    dish: view.dish.name.clone(),
                    quantity: view.reservation.quantity,
                    supplements,
                    status: view.reservation.status.to_string(),
                    total_cents: view.reservation.total_price_cents,
                }
            })
            .collect();

        ReservationReport { owner: owner.full_name(), generated_at, lines }
    }

    pub fn grand_total_cents(&self) -> i64 {
        self.lines.iter().map(|line| line.total_cents).sum()
    }

    /// Every text line of the document, top to bottom.
    pub fn text_lines(&self) -> Vec<String> {
        let mut out = vec![
            "Reservation history".to_owned(),
            format!("Exported on {}", self.generated_at.format("%d/%m/%Y %H:%M")),
            format!("Student: {}", self.owner),
            String::new(),
        ];
        if self.lines.is_empty() {
            out.push("No reservations.".to_owned());
        } else {
            out.push("Date Meal | Dish xQty | Supplements | Status | Total".to_owned());
            out.extend(self.lines.iter().map(ReportLine::render));
        }
        out.push(String::new());
        out.push(format!("Grand total: {} fcfa", format_cents(self.grand_total_cents())));
        out
    }

    pub fn render_pdf(&self) -> ServiceResult<Vec<u8>> {
        let (doc, page, layer) = PdfDocument::new("Reservation history", PAGE_WIDTH, PAGE_HEIGHT, LAYER);
        let font = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_error)?;

        let mut writer = PageWriter { doc: &doc, layer: doc.get_page(page).get_layer(layer), y: top() };
        for (index, line) in self.text_lines().iter().enumerate() {
            let size = if index == 0 { 16.0 } else { 10.0 };
            writer.write(line, size, &font);
        }

        doc.save_to_bytes().map_err(pdf_error)
    }
}

fn top() -> f32 {
    PAGE_HEIGHT.0 - MARGIN
}

fn pdf_error(err: printpdf::Error) -> ServiceError {
    ServiceError::Internal(format!("Failed to render PDF: {err}"))
}

/// Writes lines downwards, starting a new page when the bottom margin is hit.
struct PageWriter<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    y: f32,
}

impl PageWriter<'_> {
    fn write(&mut self, text: &str, size: f32, font: &IndirectFontRef) {
        if self.y < MARGIN {
            let (page, layer) = self.doc.add_page(PAGE_WIDTH, PAGE_HEIGHT, LAYER);
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = top();
        }
        if !text.is_empty() {
            self.layer.use_text(text, size, Mm(MARGIN), Mm(self.y), font);
        }
        self.y -= LINE_HEIGHT;
    }
}

/// `reservations_<username>_<YYYYMMDD>.pdf`
pub fn export_filename(username: &str, on: DateTime<Utc>) -> String {
    let safe: String = username
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '@') { c } else { '_' })
        .collect();
    format!("reservations_{safe}_{}.pdf", on.format("%Y%m%d"))
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone};

    use super::*;
    use crate::services::db_models::{Dish, Reservation, ReservationSupplement, ScheduleSlot};
    use crate::types::{DayOfWeek, DishCategory, MealSlot, ReservationStatus};

    fn user() -> User {
        User {
            id: 5,
            email: "awa@example.com".to_owned(),
            username: "awa".to_owned(),
            password_hash: String::new(),
            first_name: "Awa".to_owned(),
            last_name: "Diop".to_owned(),
            institute: "ESP".to_owned(),
            is_staff: false,
            registered_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn view(id: i64, total: i64, supplements: Vec<ReservationSupplement>) -> ReservationView {
        let now = Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap();
        ReservationView {
            reservation: Reservation {
                id,
                student_id: 5,
                slot_id: 9,
                quantity: 2,
                total_price_cents: total,
                status: ReservationStatus::Accepted,
                created_at: now,
                updated_at: now,
            },
            slot: ScheduleSlot {
                id: 9,
                dish_id: 3,
                day: DayOfWeek::Monday,
                meal: MealSlot::Lunch,
                date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
                remaining_quantity: 10,
                created_at: now,
                updated_at: now,
            },
            dish: Dish {
                id: 3,
                name: "Yassa".to_owned(),
                price_cents: 1000,
                category: DishCategory::Standard,
                description: String::new(),
                image: None,
                created_at: now,
                updated_at: now,
            },
            supplements,
        }
    }

    #[test]
    fn grand_total_sums_stored_totals() {
        let sauce = ReservationSupplement { id: 1, reservation_id: 1, name: "Sauce".to_owned(), price_cents: 150 };
        let views = vec![view(1, 2150, vec![sauce]), view(2, 2000, vec![])];
        let report = ReservationReport::build(&user(), &views, Utc::now());

        assert_eq!(report.grand_total_cents(), 4150);
        assert_eq!(report.lines[0].supplements, "Sauce");
        assert_eq!(report.lines[1].supplements, "-");
        assert_eq!(report.text_lines().last().map(String::as_str), Some("Grand total: 41.50 fcfa"));
    }

    #[test]
    fn header_names_the_student() {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 0).unwrap();
        let report = ReservationReport::build(&user(), &[], at);
        let lines = report.text_lines();

        assert_eq!(lines[1], "Exported on 05/03/2024 14:30");
        assert_eq!(lines[2], "Student: Awa Diop");
        assert!(lines.contains(&"No reservations.".to_owned()));
    }

    #[test]
    fn long_histories_render_to_a_pdf() {
        let views: Vec<_> = (1..=80).map(|id| view(id, 2000, vec![])).collect();
        let bytes = ReservationReport::build(&user(), &views, Utc::now()).render_pdf().unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn filename_carries_username_and_day() {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 0).unwrap();
        assert_eq!(export_filename("awa", at), "reservations_awa_20240305.pdf");
        assert_eq!(export_filename("a b/c", at), "reservations_a_b_c_20240305.pdf");
    }
}
