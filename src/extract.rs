use scraper::{Html, Selector};
use std::sync::LazyLock;

/// CSS locations of the nine data points on a product page.
///
/// The nutrition selectors are deep and brittle on purpose: they pin the
/// exact cells of the AEM nutrition summary grid. When the page structure
/// shifts, update this table and the fixture in the tests below.
pub mod selectors {
    pub const NAME: &str = ".cmp-product-details-main__heading-title";
    pub const DESCRIPTION: &str = ".body";

    // Primary nutrition grid: calories / fats / proteins.
    pub const CALORIES: &str = concat!(
        "#pdp-nutrition-summary > div",
        " > div.primarynutritions.aem-GridColumn.aem-GridColumn--default--12",
        " > div > ul > li:nth-child(1) > span.value > span:nth-child(3)",
    );
    pub const FATS: &str = concat!(
        "#pdp-nutrition-summary > div",
        " > div.primarynutritions.aem-GridColumn.aem-GridColumn--default--12",
        " > div > ul > li:nth-child(2) > span.value > span:nth-child(2)",
    );
    pub const PROTEINS: &str = concat!(
        "#pdp-nutrition-summary > div",
        " > div.primarynutritions.aem-GridColumn.aem-GridColumn--default--12",
        " > div > ul > li:nth-child(3) > span.value > span:nth-child(2)",
    );

    // Secondary grid behind the accordion: unsaturated fats / sugar / salt / portion.
    pub const UNSATURATED_FATS: &str = concat!(
        "#pdp-nutrition-summary > div",
        " > div.secondarynutritions.aem-GridColumn--default--none.aem-GridColumn",
        ".aem-GridColumn--default--12.aem-GridColumn--offset--default--0",
        " > div > div > div > div.cmp-nutrition-summary__details-column-view-desktop",
        " > ul > li:nth-child(1) > span.value > span:nth-child(1)",
    );
    pub const SUGAR: &str = concat!(
        "#pdp-nutrition-summary > div",
        " > div.secondarynutritions.aem-GridColumn--default--none.aem-GridColumn",
        ".aem-GridColumn--default--12.aem-GridColumn--offset--default--0",
        " > div > div > div > div.cmp-nutrition-summary__details-column-view-desktop",
        " > ul > li:nth-child(2) > span.value > span:nth-child(1)",
    );
    pub const SALT: &str = concat!(
        "#pdp-nutrition-summary > div",
        " > div.secondarynutritions.aem-GridColumn--default--none.aem-GridColumn",
        ".aem-GridColumn--default--12.aem-GridColumn--offset--default--0",
        " > div > div > div > div.cmp-nutrition-summary__details-column-view-desktop",
        " > ul > li:nth-child(3) > span.value > span.sr-only",
    );
    pub const PORTION: &str = concat!(
        "#pdp-nutrition-summary > div",
        " > div.secondarynutritions.aem-GridColumn--default--none.aem-GridColumn",
        ".aem-GridColumn--default--12.aem-GridColumn--offset--default--0",
        " > div > div > div > div.cmp-nutrition-summary__details-column-view-desktop",
        " > ul > li:nth-child(4) > span.value > span:nth-child(1)",
    );
}

/// Field name → CSS rule, in record order. Lets the field set be checked
/// independently of any normalization.
pub const RULES: [(&str, &str); 9] = [
    ("name", selectors::NAME),
    ("description", selectors::DESCRIPTION),
    ("calories", selectors::CALORIES),
    ("fats", selectors::FATS),
    ("proteins", selectors::PROTEINS),
    ("unsaturated_fats", selectors::UNSATURATED_FATS),
    ("sugar", selectors::SUGAR),
    ("salt", selectors::SALT),
    ("portion", selectors::PORTION),
];

/// Raw text pulled from the nine page locations, before any normalization.
#[derive(Debug, Default, Clone)]
pub struct RawFields {
    pub name: String,
    pub description: String,
    pub calories: String,
    pub fats: String,
    pub proteins: String,
    pub unsaturated_fats: String,
    pub sugar: String,
    pub salt: String,
    pub portion: String,
}

impl RawFields {
    fn fields_mut(&mut self) -> [&mut String; 9] {
        [
            &mut self.name,
            &mut self.description,
            &mut self.calories,
            &mut self.fats,
            &mut self.proteins,
            &mut self.unsaturated_fats,
            &mut self.sugar,
            &mut self.salt,
            &mut self.portion,
        ]
    }

    /// Replace NBSP with a plain space in every field. The page pads values
    /// with U+00A0 and those must not survive into stored records.
    pub fn replace_nbsp(&mut self) {
        for field in self.fields_mut() {
            if field.contains('\u{a0}') {
                *field = field.replace('\u{a0}', " ");
            }
        }
    }
}

static SEL: LazyLock<[Selector; 9]> = LazyLock::new(|| {
    RULES.map(|(name, css)| {
        Selector::parse(css).unwrap_or_else(|e| panic!("bad selector for {}: {}", name, e))
    })
});

/// Pull the nine raw field texts out of a rendered product page.
///
/// A missing element is an expected condition (the markup varies item to
/// item) and yields the empty-string default; this never fails.
pub fn extract_fields(doc: &Html) -> RawFields {
    let [name, description, calories, fats, proteins, unsaturated_fats, sugar, salt, portion] =
        SEL.each_ref().map(|sel| select_text(doc, sel));
    RawFields {
        name,
        description,
        calories,
        fats,
        proteins,
        unsaturated_fats,
        sugar,
        salt,
        portion,
    }
}

fn select_text(doc: &Html, sel: &Selector) -> String {
    doc.select(sel)
        .next()
        .map(|el| el.text().collect::<String>())
        .unwrap_or_default()
}

// ── Tests ──
