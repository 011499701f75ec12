//! Static food-preservation knowledge base

/// One preservation technique
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreservationTechnique {
    pub name: &'static str,
    pub principle: &'static str,
    pub methods: &'static [&'static str],
    pub suitable_for: &'static [&'static str],
}

pub const PRESERVATION_TECHNIQUES: &[PreservationTechnique] = &[
    PreservationTechnique {
        name: "Drying",
        principle: "Removes moisture from food to inhibit the growth of bacteria, yeast, and mold.",
        methods: &["Sun drying", "Oven drying", "Dehydrator"],
        suitable_for: &["Fruits", "Vegetables", "Herbs", "Meats (Jerky)"],
    },
    PreservationTechnique {
        name: "Freezing",
        principle: "Lowers temperature to slow down enzyme activity and microbial growth. Does not sterilize food.",
        methods: &["Blast freezing", "Home freezing"],
        suitable_for: &["Fruits", "Vegetables", "Meats", "Prepared meals"],
    },
    PreservationTechnique {
        name: "Fermentation",
        principle: "Uses beneficial microorganisms (bacteria, yeast) to convert carbohydrates into alcohol or organic acids.",
        methods: &["Lacto-fermentation", "Alcoholic fermentation"],
        suitable_for: &["Vegetables (Sauerkraut, Kimchi)", "Dairy (Yogurt)", "Beverages"],
    },
    PreservationTechnique {
        name: "Canning",
        principle: "Seals food in sterilized containers and applies heat to destroy spoilage organisms.",
        methods: &["Water bath canning (High acid)", "Pressure canning (Low acid)"],
        suitable_for: &["Fruits", "Vegetables", "Meats"],
    },
    PreservationTechnique {
        name: "High-Pressure Processing (HPP)",
        principle: "A non-thermal method that uses extremely high pressure to inactivate pathogens while maintaining freshness.",
        methods: &["Industrial HPP chambers"],
        suitable_for: &["Juices", "Dips", "Meats", "Seafood"],
    },
    PreservationTechnique {
        name: "Cold Plasma",
        principle: "Uses ionized gas to decontaminate food surfaces without heat.",
        methods: &["Dielectric barrier discharge"],
        suitable_for: &["Fresh produce surface sterilization"],
    },
    PreservationTechnique {
        name: "Vacuum Packaging",
        principle: "Removes air from the package prior to sealing to reduce atmospheric oxygen, limiting the growth of aerobic bacteria or fungi.",
        methods: &["Vacuum sealer"],
        suitable_for: &["Meats", "Fish", "Cheese", "Vegetables (to be frozen)"],
    },
];

/// Render the knowledge base as the Markdown block embedded in the system prompt
pub fn knowledge_context() -> String {
    let mut context = String::from("Food Preservation Techniques Knowledge Base:\n\n");
    for technique in PRESERVATION_TECHNIQUES {
        context.push_str(&format!(
            "## {}\n- **Principle**: {}\n- **Methods**: {}\n- **Suitable For**: {}\n\n",
            technique.name,
            technique.principle,
            technique.methods.join(", "),
            technique.suitable_for.join(", ")
        ));
    }
    context
}
