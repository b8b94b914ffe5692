use crate::{
    pdf::{Canvas, Font, CM},
    report::{month_name, OwnerSummary, ReportFilter, Summary},
    structs::{Owner, PaymentView},
};

const ROW_HEIGHT: f32 = 20.0;
const BOTTOM_MARGIN: f32 = 3.0 * CM;

/// Columns of a bordered table, as (x, width) pairs.
struct Table {
    columns: Vec<(f32, f32)>,
}

impl Table {
    fn new(start: f32, widths: &[f32]) -> Self {
        let mut x = start;
        let columns = widths
            .iter()
            .map(|&w| {
                let col = (x, w);
                x += w;
                col
            })
            .collect();
        Table { columns }
    }

    fn header(&self, canvas: &mut Canvas, y: f32, labels: &[&str]) {
        canvas.set_font(Font::HelveticaBold, 11.0);
        for (&(x, w), label) in self.columns.iter().zip(labels) {
            canvas.rect(x, y, w, ROW_HEIGHT);
            canvas.draw_centred_string(x + w / 2.0, y + 6.0, label);
        }
    }

    fn row(&self, canvas: &mut Canvas, y: f32, cells: &[String]) {
        canvas.set_font(Font::Helvetica, 10.0);
        for (&(x, w), cell) in self.columns.iter().zip(cells) {
            canvas.rect(x, y, w, ROW_HEIGHT);
            canvas.draw_string(x + 5.0, y + 6.0, cell);
        }
    }

    /// Draws `rows` below a header starting at `y`, breaking pages as needed.
    /// Returns the y of the line under the last row.
    fn draw(&self, canvas: &mut Canvas, mut y: f32, labels: &[&str], rows: &[Vec<String>]) -> f32 {
        self.header(canvas, y, labels);
        y -= ROW_HEIGHT;
        for cells in rows {
            if y < BOTTOM_MARGIN {
                canvas.show_page();
                y = canvas.height() - 2.0 * CM;
                self.header(canvas, y, labels);
                y -= ROW_HEIGHT;
            }
            self.row(canvas, y, cells);
            y -= ROW_HEIGHT;
        }
        y
    }
}

fn title(canvas: &mut Canvas, text: &str, subtitle: Option<&str>) {
    let center = canvas.width() / 2.0;
    let top = canvas.height();
    canvas.set_font(Font::HelveticaBold, 16.0);
    canvas.draw_centred_string(center, top - 50.0, text);
    if let Some(subtitle) = subtitle {
        canvas.set_font(Font::Helvetica, 12.0);
        canvas.draw_centred_string(center, top - 70.0, subtitle);
    }
}

fn signatures(canvas: &mut Canvas, mut y: f32) {
    if y < BOTTOM_MARGIN {
        canvas.show_page();
        y = canvas.height() - 3.0 * CM;
    }
    let right = canvas.width() - 7.0 * CM;
    canvas.set_font(Font::Helvetica, 12.0);
    canvas.draw_string(2.0 * CM, y, "Signature du gestionnaire");
    canvas.draw_string(right, y, "Signature du propriétaire");
}

/// Two-column label/value table.
fn info_table(canvas: &mut Canvas, mut y: f32, infos: &[(&str, String)]) -> f32 {
    let table = Table::new(2.0 * CM, &[8.0 * CM, 8.0 * CM]);
    canvas.set_font(Font::Helvetica, 11.0);
    for (label, value) in infos {
        for &(x, w) in &table.columns {
            canvas.rect(x, y, w, ROW_HEIGHT);
        }
        canvas.draw_string(table.columns[0].0 + 5.0, y + 5.0, label);
        let (x, w) = table.columns[1];
        canvas.draw_right_string(x + w - 5.0, y + 5.0, value);
        y -= ROW_HEIGHT;
    }
    y
}

/// Monthly invoice for one owner.
pub fn invoice(agency: &str, owner: &Owner, summary: &Summary, month_label: &str) -> Vec<u8> {
    let mut canvas = Canvas::a4();
    title(
        &mut canvas,
        &format!("FACTURE MENSUELLE {}", agency),
        Some(&format!("Mois de la facture : {}", month_label)),
    );

    let infos = [
        ("Propriétaire", owner.name.clone()),
        ("Montant total loyers locataires", summary.total_rent.to_string()),
        ("Total loyers reçus", summary.total_received.to_string()),
        ("Loyer restant (impayés)", summary.remaining.to_string()),
        ("Commission entreprise", summary.commission.to_string()),
        ("Frais divers", summary.misc_fees.to_string()),
        ("Net à reverser", summary.net_to_owner.to_string()),
    ];
    let top = canvas.height() - 120.0;
    let y = info_table(&mut canvas, top, &infos);

    let rows: Vec<Vec<String>> = summary
        .lines
        .iter()
        .map(|line| {
            vec![
                line.name.clone(),
                line.paid.to_string(),
                line.status.label().to_owned(),
            ]
        })
        .collect();
    let table = Table::new(2.0 * CM, &[7.0 * CM, 5.0 * CM, 5.0 * CM]);
    let y = table.draw(
        &mut canvas,
        y - 40.0,
        &["Locataire", "Montant payé", "Statut"],
        &rows,
    );

    signatures(&mut canvas, y - 40.0);
    canvas.save()
}

/// Global rental report for the dashboard filters.
pub fn dashboard_report(
    owners_count: i64,
    summary: &Summary,
    filter: &ReportFilter,
    owner: Option<&Owner>,
) -> Vec<u8> {
    let mut canvas = Canvas::a4();
    let period = filter.period_label();
    let subtitle = (!period.is_empty()).then(|| format!("Mois : {}", period));
    title(&mut canvas, "RAPPORT GLOBAL LOCATIF", subtitle.as_deref());

    let mut lines = Vec::new();
    if let Some(owner) = owner {
        lines.push(format!("Propriétaire : {}", owner.name));
    }
    lines.extend([
        format!("Nombre de propriétaires : {}", owners_count),
        format!("Nombre de locataires : {}", summary.tenants_count),
        format!("Montant total loyers locataires : {}", summary.total_rent),
        format!("Total loyers reçus : {}", summary.total_received),
        format!("Loyer restant (impayés) : {}", summary.remaining),
        format!("Commission totale entreprise : {}", summary.commission),
        format!("Frais divers : {}", summary.misc_fees),
        format!("Net à reverser aux propriétaires : {}", summary.net_to_owner),
    ]);

    let mut y = canvas.height() - 110.0;
    canvas.set_font(Font::Helvetica, 12.0);
    for line in &lines {
        canvas.draw_string(50.0, y, line);
        y -= 20.0;
    }
    y -= 20.0;
    canvas.draw_string(50.0, y, &format!("Locataires payés : {}", summary.paid_tenants));
    y -= 20.0;
    canvas.draw_string(
        50.0,
        y,
        &format!("Locataires impayés : {}", summary.unpaid_tenants),
    );

    signatures(&mut canvas, y - 60.0);
    canvas.save()
}

/// Detailed report of one owner: every payment in the period and the totals.
pub fn owner_report(
    agency: &str,
    owner: &Owner,
    summary: &Summary,
    payments: &[PaymentView],
    filter: &ReportFilter,
) -> Vec<u8> {
    let mut canvas = Canvas::a4();
    let period = filter.period_label();
    let subtitle = if period.is_empty() {
        agency.to_owned()
    } else {
        format!("{} - {}", agency, period)
    };
    title(&mut canvas, "RAPPORT PROPRIÉTAIRE", Some(&subtitle));

    let infos = [
        ("Propriétaire", owner.name.clone()),
        ("Téléphone", owner.phone.clone()),
        ("Locataires", summary.tenants_count.to_string()),
        ("Locataires payés", summary.paid_tenants.to_string()),
        ("Locataires impayés", summary.unpaid_tenants.to_string()),
    ];
    let top = canvas.height() - 120.0;
    let y = info_table(&mut canvas, top, &infos);

    let rows: Vec<Vec<String>> = payments
        .iter()
        .map(|p| {
            let period = format!(
                "{} {}",
                month_name(p.month as u32).unwrap_or("?"),
                p.year
            );
            vec![
                p.payment_date.format("%d/%m/%Y").to_string(),
                p.tenant_name.clone(),
                period,
                p.amount.to_string(),
                p.misc_fee.to_string(),
                if p.paid_in_advance { "Oui" } else { "Non" }.to_owned(),
            ]
        })
        .collect();
    let table = Table::new(
        1.5 * CM,
        &[2.6 * CM, 4.4 * CM, 3.4 * CM, 2.6 * CM, 2.2 * CM, 2.8 * CM],
    );
    let mut y = table.draw(
        &mut canvas,
        y - 40.0,
        &["Date", "Locataire", "Période", "Montant", "Frais", "En avance"],
        &rows,
    );

    if y < BOTTOM_MARGIN + 5.0 * ROW_HEIGHT {
        canvas.show_page();
        y = canvas.height() - 2.0 * CM;
    }
    let totals = [
        ("Montant total loyers locataires", summary.total_rent.to_string()),
        ("Total loyers reçus", summary.total_received.to_string()),
        ("Commission entreprise", summary.commission.to_string()),
        ("Frais divers", summary.misc_fees.to_string()),
        ("Net à reverser", summary.net_to_owner.to_string()),
    ];
    let y = info_table(&mut canvas, y - 30.0, &totals);

    signatures(&mut canvas, y - 40.0);
    canvas.save()
}

/// Per-owner breakdown with a totals row.
pub fn global_report(
    agency: &str,
    owners: &[OwnerSummary],
    totals: &Summary,
    filter: &ReportFilter,
) -> Vec<u8> {
    let mut canvas = Canvas::a4();
    let period = filter.period_label();
    let subtitle = if period.is_empty() {
        agency.to_owned()
    } else {
        format!("{} - {}", agency, period)
    };
    title(
        &mut canvas,
        "RAPPORT GLOBAL PAR PROPRIÉTAIRE",
        Some(&subtitle),
    );

    let mut rows: Vec<Vec<String>> = owners
        .iter()
        .map(|o| {
            vec![
                o.owner.name.clone(),
                o.summary.tenants_count.to_string(),
                o.summary.total_rent.to_string(),
                o.summary.total_received.to_string(),
                o.summary.commission.to_string(),
                o.summary.net_to_owner.to_string(),
            ]
        })
        .collect();
    rows.push(vec![
        "TOTAL".to_owned(),
        totals.tenants_count.to_string(),
        totals.total_rent.to_string(),
        totals.total_received.to_string(),
        totals.commission.to_string(),
        totals.net_to_owner.to_string(),
    ]);

    let table = Table::new(
        1.5 * CM,
        &[4.6 * CM, 2.2 * CM, 3.0 * CM, 3.0 * CM, 2.8 * CM, 2.4 * CM],
    );
    let top = canvas.height() - 120.0;
    let y = table.draw(
        &mut canvas,
        top,
        &["Propriétaire", "Locataires", "Loyers", "Reçus", "Commission", "Net"],
        &rows,
    );

    canvas.set_font(Font::Helvetica, 12.0);
    let y = y - 30.0;
    canvas.draw_string(
        2.0 * CM,
        y,
        &format!(
            "Locataires payés : {}    Locataires impayés : {}",
            totals.paid_tenants, totals.unpaid_tenants
        ),
    );

    signatures(&mut canvas, y - 50.0);
    canvas.save()
}
