use anyhow::{Context, Result};
use rust_xlsxwriter::{Format, FormatAlign, Workbook, Worksheet};

const MONTHS: [&str; 12] = [
    "2024-01", "2024-02", "2024-03", "2024-04", "2024-05", "2024-06", "2024-07", "2024-08",
    "2024-09", "2024-10", "2024-11", "2024-12",
];

const REGIONS: [(&str, f64); 3] = [("North", 120.0), ("South", 90.0), ("East", 60.0)];

/// Seasonal sales curve with up to ±5% noise.
fn monthly_sales(base: f64, month: usize, noise: &mut Noise) -> f64 {
    let season = (month as f64 / 12.0 * 2.0 * std::f64::consts::PI).sin();
    (base * (1.0 + 0.25 * season + 0.05 * noise.next_signed())).round()
}

/// Seeded linear congruential generator, so every run writes the same book.
struct Noise(u64);

impl Noise {
    fn next_signed(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        // top 53 bits → [0, 1) → [-1, 1)
        (self.0 >> 11) as f64 / (1u64 << 53) as f64 * 2.0 - 1.0
    }
}

/// Two header rows: `Period` over Month/Quarter, `Sales` over the regions,
/// `Cost` over Total. Group labels are merged across their columns.
fn write_grouped(sheet: &mut Worksheet, noise: &mut Noise) -> Result<()> {
    let group = Format::new().set_bold().set_align(FormatAlign::Center);
    let sub = Format::new().set_bold();
    let last_region = REGIONS.len() as u16 + 1;

    sheet.merge_range(0, 0, 0, 1, "Period", &group)?;
    sheet.merge_range(0, 2, 0, last_region, "Sales", &group)?;
    sheet.write_string_with_format(0, last_region + 1, "Cost", &group)?;

    sheet.write_string_with_format(1, 0, "Month", &sub)?;
    sheet.write_string_with_format(1, 1, "Quarter", &sub)?;
    for (i, (region, _)) in REGIONS.iter().enumerate() {
        sheet.write_string_with_format(1, 2 + i as u16, *region, &sub)?;
    }
    sheet.write_string_with_format(1, last_region + 1, "Total", &sub)?;

    for (m, month) in MONTHS.iter().enumerate() {
        let row = 2 + m as u32;
        sheet.write_string(row, 0, *month)?;
        sheet.write_string(row, 1, format!("Q{}", m / 3 + 1))?;
        let mut total = 0.0;
        for (i, (_, base)) in REGIONS.iter().enumerate() {
            let sales = monthly_sales(*base, m, noise);
            total += sales;
            sheet.write_number(row, 2 + i as u16, sales)?;
        }
        sheet.write_number(row, last_region + 1, (total * 0.6).round())?;
    }
    Ok(())
}

/// One header row: Date, Sales, Cost.
fn write_flat(sheet: &mut Worksheet, noise: &mut Noise) -> Result<()> {
    let header = Format::new().set_bold();
    for (col, name) in ["Date", "Sales", "Cost"].iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *name, &header)?;
    }
    for (m, month) in MONTHS.iter().enumerate() {
        let row = 1 + m as u32;
        let sales = monthly_sales(200.0, m, noise);
        sheet.write_string(row, 0, *month)?;
        sheet.write_number(row, 1, sales)?;
        sheet.write_number(row, 2, (sales * 0.55).round())?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let output_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "sample_sales.xlsx".to_string());
    let mut noise = Noise(42);
    let mut workbook = Workbook::new();

    let grouped = workbook.add_worksheet();
    grouped.set_name("Regional")?;
    write_grouped(grouped, &mut noise).context("writing grouped sheet")?;

    let flat = workbook.add_worksheet();
    flat.set_name("Monthly")?;
    write_flat(flat, &mut noise).context("writing flat sheet")?;

    workbook
        .save(&output_path)
        .with_context(|| format!("saving {output_path}"))?;

    println!(
        "Wrote {} months for {} regions to {output_path}",
        MONTHS.len(),
        REGIONS.len()
    );
    Ok(())
}
