use crate::core::{ClassReportRow, StudentMastery};
use crate::utils::error::Result;
use rust_xlsxwriter::utility::row_col_to_cell;
use rust_xlsxwriter::{
    Color, ConditionalFormat2ColorScale, ConditionalFormatType, Format, FormatAlign, Formula,
    Workbook, Worksheet,
};

pub struct FixedTopic {
    pub id: &'static str,
    pub title: &'static str,
}

/// Column pairs in the report follow this order; other topics are dropped.
pub const FIXED_TOPICS: [FixedTopic; 8] = [
    FixedTopic { id: "xb0caa40e7a222a7c", title: "Limits and continuity" },
    FixedTopic { id: "x5432c6f7037ffefc", title: "Differentiation: definition and basic derivative rules" },
    FixedTopic { id: "xb1aee696f6974830", title: "Differentiation: composite, implicit, and inverse functions" },
    FixedTopic { id: "x90c04f514dafe6d8", title: "Contextual applications of differentiation" },
    FixedTopic { id: "xd8ffd65fe7b9701f", title: "Applying derivatives to analyze functions" },
    FixedTopic { id: "x3a79bcb1ef658b56", title: "Integration and accumulation of change" },
    FixedTopic { id: "xf7faa64f661a9e62", title: "Differential equations" },
    FixedTopic { id: "xb80ad6dc16530012", title: "Applications of integration" },
];

const NAME_COL: u16 = 0;
const OVERALL_COL: u16 = 1;
const TOTAL_COL: u16 = 2;
const FIRST_TOPIC_COL: u16 = 3;
const LAST_COL: u16 = FIRST_TOPIC_COL + 2 * FIXED_TOPICS.len() as u16 - 1;
const LAST_ROW: u32 = 1_048_575;
const MAX_SHEET_NAME_CHARS: usize = 31;

const HEADER_ROW_HEIGHT: f64 = 35.05;
const NAME_COL_WIDTH: f64 = 26.24;
const DATA_COL_WIDTH: f64 = 11.6;
const ACCENT_COLOR: u32 = 0x8577E2;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    /// Stored with the leading `=`.
    Formula(String),
    Blank,
}

/// One worksheet before it is written: a name and the data rows below the header.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetLayout {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

/// 工作表名稱不可含 * ? : \ / [ ]，逐字元替換成 _
pub fn sheet_name(display_name: &str) -> String {
    display_name
        .chars()
        .map(|c| match c {
            '*' | '?' | ':' | '\\' | '/' | '[' | ']' => '_',
            other => other,
        })
        .take(MAX_SHEET_NAME_CHARS)
        .collect()
}

pub fn header_titles() -> Vec<&'static str> {
    let mut titles = vec!["Name", "Overall"];
    titles.extend(FIXED_TOPICS.iter().map(|topic| topic.title));
    titles
}

fn is_percentage_col(col: u16) -> bool {
    col % 2 == 1 && col <= LAST_COL
}

/// `row` is the zero-based worksheet row the student lands on.
pub fn student_row(student: &StudentMastery, row: u32) -> Vec<Cell> {
    let total_available: f64 = student
        .units
        .iter()
        .map(|unit| unit.mastery.points_available)
        .sum();

    let earned_cells: Vec<String> = (0..FIXED_TOPICS.len() as u16)
        .map(|i| row_col_to_cell(row, FIRST_TOPIC_COL + 2 * i + 1))
        .collect();

    let mut cells = vec![
        Cell::Text(student.student_name.clone()),
        Cell::Formula(format!(
            "={}/{}",
            row_col_to_cell(row, TOTAL_COL),
            total_available
        )),
        Cell::Formula(format!("=SUM({})", earned_cells.join(","))),
    ];

    for (topic, earned_cell) in FIXED_TOPICS.iter().zip(&earned_cells) {
        match student.units.iter().find(|unit| unit.topic_id == topic.id) {
            Some(unit) => {
                cells.push(Cell::Formula(format!(
                    "={}/{}",
                    earned_cell, unit.mastery.points_available
                )));
                cells.push(Cell::Number(unit.mastery.points_earned));
            }
            None => {
                cells.push(Cell::Blank);
                cells.push(Cell::Blank);
            }
        }
    }

    cells
}

pub fn layout_sheet(class_row: &ClassReportRow) -> SheetLayout {
    SheetLayout {
        name: sheet_name(&class_row.class.display_name),
        rows: class_row
            .students
            .iter()
            .enumerate()
            .map(|(i, student)| student_row(student, i as u32 + 1))
            .collect(),
    }
}

struct ReportFormats {
    header: Format,
    name: Format,
    percentage: Format,
    points: Format,
}

impl ReportFormats {
    fn new() -> Self {
        let arial = Format::new().set_font_name("Arial").set_font_size(10);
        let calibri = Format::new().set_font_name("Calibri").set_font_size(11);

        Self {
            header: arial
                .clone()
                .set_bold()
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter)
                .set_text_wrap()
                .set_shrink(),
            name: arial,
            percentage: calibri.clone().set_num_format("0.0%"),
            points: calibri,
        }
    }

    fn for_col(&self, col: u16) -> &Format {
        if col == NAME_COL {
            &self.name
        } else if is_percentage_col(col) {
            &self.percentage
        } else {
            &self.points
        }
    }
}

pub struct ReportSynthesizer {
    formats: ReportFormats,
}

impl Default for ReportSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportSynthesizer {
    pub fn new() -> Self {
        Self {
            formats: ReportFormats::new(),
        }
    }

    pub fn build_workbook(&self, classes: &[ClassReportRow]) -> Result<Workbook> {
        let mut workbook = Workbook::new();

        for class_row in classes {
            let layout = layout_sheet(class_row);
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(&layout.name)?;
            self.write_sheet(worksheet, &layout)?;
            tracing::debug!("Sheet '{}' with {} row(s)", layout.name, layout.rows.len());
        }

        Ok(workbook)
    }

    /// 產生 xlsx 位元組；工作表名稱重複等錯誤會在這裡回報
    pub fn to_bytes(&self, classes: &[ClassReportRow]) -> Result<Vec<u8>> {
        let mut workbook = self.build_workbook(classes)?;
        Ok(workbook.save_to_buffer()?)
    }

    fn write_sheet(&self, worksheet: &mut Worksheet, layout: &SheetLayout) -> Result<()> {
        self.write_header(worksheet)?;

        worksheet.set_column_width(NAME_COL, NAME_COL_WIDTH)?;
        worksheet.set_column_format(NAME_COL, &self.formats.name)?;
        for col in OVERALL_COL..=LAST_COL {
            worksheet.set_column_width(col, DATA_COL_WIDTH)?;
            worksheet.set_column_format(col, self.formats.for_col(col))?;
        }

        for (i, cells) in layout.rows.iter().enumerate() {
            let row = i as u32 + 1;
            for (col, cell) in cells.iter().enumerate() {
                let col = col as u16;
                let format = self.formats.for_col(col);
                match cell {
                    Cell::Text(text) => {
                        worksheet.write_string_with_format(row, col, text, format)?;
                    }
                    Cell::Number(number) => {
                        worksheet.write_number_with_format(row, col, *number, format)?;
                    }
                    Cell::Formula(formula) => {
                        worksheet.write_formula_with_format(
                            row,
                            col,
                            Formula::new(formula.as_str()),
                            format,
                        )?;
                    }
                    Cell::Blank => {
                        worksheet.write_blank(row, col, format)?;
                    }
                }
            }
        }

        let color_scale = ConditionalFormat2ColorScale::new()
            .set_minimum(ConditionalFormatType::Number, 0.0)
            .set_maximum(ConditionalFormatType::Number, 1.0)
            .set_minimum_color(Color::White)
            .set_maximum_color(Color::RGB(ACCENT_COLOR));
        for col in (OVERALL_COL..=LAST_COL).filter(|col| is_percentage_col(*col)) {
            worksheet.add_conditional_format(0, col, LAST_ROW, col, &color_scale)?;
        }

        Ok(())
    }

    fn write_header(&self, worksheet: &mut Worksheet) -> Result<()> {
        worksheet.set_row_height(0, HEADER_ROW_HEIGHT)?;
        worksheet.write_string_with_format(0, NAME_COL, "Name", &self.formats.header)?;

        for (i, title) in header_titles().into_iter().skip(1).enumerate() {
            let first_col = OVERALL_COL + 2 * i as u16;
            worksheet.merge_range(0, first_col, 0, first_col + 1, title, &self.formats.header)?;
        }
        Ok(())
    }
}
