use super::{Dimension, UnitDef};

use Dimension::*;

/// Fahrenheit offset into kelvin: 273.15 - 32 * 5/9.
const FAHRENHEIT_OFFSET: f64 = 273.15 - 32.0 * 5.0 / 9.0;

pub(super) static UNITS: &[UnitDef] = &[
    // weight (base kg)
    UnitDef::linear("mg", Weight, 1e-6, &["milligram", "milligrams", "밀리그램"]),
    UnitDef::linear("g", Weight, 1e-3, &["gram", "grams", "gr", "gramme", "그램"]),
    UnitDef::linear(
        "kg",
        Weight,
        1.0,
        &["kilogram", "kilograms", "kilo", "kilos", "kgs", "킬로그램", "킬로"],
    ),
    UnitDef::linear(
        "tonne",
        Weight,
        1e3,
        &["t", "ton", "tons", "tonnes", "metric ton", "metric tons", "mt", "톤"],
    ),
    UnitDef::linear("kt", Weight, 1e6, &["kilotonne", "kilotonnes", "kiloton", "kilotons"]),
    UnitDef::linear("lb", Weight, 0.453_592_37, &["lbs", "pound", "pounds", "파운드"]),
    UnitDef::linear("oz", Weight, 0.028_349_523_125, &["ounce", "ounces", "온스"]),
    // volume (base L)
    UnitDef::linear("mL", Volume, 1e-3, &["milliliter", "millilitre", "cc", "밀리리터"]),
    UnitDef::linear("cL", Volume, 1e-2, &["centiliter", "centilitre"]),
    UnitDef::linear(
        "L",
        Volume,
        1.0,
        &["liter", "litre", "liters", "litres", "lt", "ltr", "리터"],
    ),
    UnitDef::linear("kL", Volume, 1e3, &["kiloliter", "kilolitre", "킬로리터"]),
    UnitDef::linear(
        "m³",
        Volume,
        1e3,
        &["m3", "cubic meter", "cubic metre", "cubic meters", "cubic metres", "cbm", "세제곱미터", "루베"],
    ),
    UnitDef::linear("gal", Volume, 3.785_411_784, &["gallon", "gallons", "us gal", "갤런"]),
    UnitDef::linear(
        "imp gal",
        Volume,
        4.546_09,
        &["imperial gallon", "imperial gallons", "uk gal"],
    ),
    UnitDef::linear("bbl", Volume, 158.987_294_928, &["barrel", "barrels", "배럴"]),
    UnitDef::linear("ft³", Volume, 28.316_846_592, &["ft3", "cubic foot", "cubic feet", "cf"]),
    // distance (base m)
    UnitDef::linear("mm", Distance, 1e-3, &["millimeter", "millimetre", "밀리미터"]),
    UnitDef::linear("cm", Distance, 1e-2, &["centimeter", "centimetre", "센티미터"]),
    UnitDef::linear("m", Distance, 1.0, &["meter", "metre", "meters", "metres", "미터"]),
    UnitDef::linear(
        "km",
        Distance,
        1e3,
        &["kilometer", "kilometre", "kilometers", "kilometres", "킬로미터", "키로"],
    ),
    UnitDef::linear("inch", Distance, 0.0254, &["inches"]),
    UnitDef::linear("ft", Distance, 0.3048, &["foot", "feet"]),
    UnitDef::linear("yd", Distance, 0.9144, &["yard", "yards"]),
    UnitDef::linear("mile", Distance, 1_609.344, &["mi", "miles", "마일"]),
    UnitDef::linear("nmi", Distance, 1_852.0, &["nautical mile", "nautical miles", "nm"]),
    // energy (base J)
    UnitDef::linear("J", Energy, 1.0, &["joule", "joules"]),
    UnitDef::linear("kJ", Energy, 1e3, &["kilojoule", "kilojoules"]),
    UnitDef::linear("MJ", Energy, 1e6, &["megajoule", "megajoules"]),
    UnitDef::linear("GJ", Energy, 1e9, &["gigajoule", "gigajoules"]),
    UnitDef::linear("TJ", Energy, 1e12, &["terajoule", "terajoules"]),
    UnitDef::linear("Wh", Energy, 3.6e3, &["watt hour", "watt-hour", "watt hours"]),
    UnitDef::linear(
        "kWh",
        Energy,
        3.6e6,
        &["kilowatt hour", "kilowatt-hour", "kilowatt hours", "kilowatt-hours", "킬로와트시"],
    ),
    UnitDef::linear("MWh", Energy, 3.6e9, &["megawatt hour", "megawatt-hour", "megawatt hours"]),
    UnitDef::linear("GWh", Energy, 3.6e12, &["gigawatt hour", "gigawatt-hour"]),
    UnitDef::linear("BTU", Energy, 1_055.055_852_62, &["btus", "british thermal unit"]),
    UnitDef::linear("MMBtu", Energy, 1.055_055_852_62e9, &["mmbtus", "million btu"]),
    UnitDef::linear("therm", Energy, 1.055_055_852_62e8, &["therms"]),
    UnitDef::linear("cal", Energy, 4.184, &["calorie", "calories"]),
    UnitDef::linear("kcal", Energy, 4_184.0, &["kilocalorie", "kilocalories", "킬로칼로리"]),
    UnitDef::linear("toe", Energy, 4.1868e10, &["tonne of oil equivalent", "tonnes of oil equivalent"]),
    // time (base s)
    UnitDef::linear("s", Time, 1.0, &["sec", "secs", "second", "seconds", "초"]),
    UnitDef::linear("min", Time, 60.0, &["mins", "minute", "minutes", "분"]),
    UnitDef::linear("h", Time, 3_600.0, &["hr", "hrs", "hour", "hours", "시간"]),
    UnitDef::linear("day", Time, 86_400.0, &["d", "days", "일"]),
    UnitDef::linear("week", Time, 604_800.0, &["wk", "weeks", "주"]),
    UnitDef::linear("month", Time, 2_629_800.0, &["mo", "months", "개월", "달"]),
    UnitDef::linear("year", Time, 31_557_600.0, &["yr", "yrs", "years", "y", "년"]),
    // power (base W)
    UnitDef::linear("W", Power, 1.0, &["watt", "watts", "와트"]),
    UnitDef::linear("kW", Power, 1e3, &["kilowatt", "kilowatts", "킬로와트"]),
    UnitDef::linear("MW", Power, 1e6, &["megawatt", "megawatts"]),
    UnitDef::linear("GW", Power, 1e9, &["gigawatt", "gigawatts"]),
    UnitDef::linear("hp", Power, 745.699_871_582_270_2, &["horsepower", "마력"]),
    // pressure (base Pa)
    UnitDef::linear("Pa", Pressure, 1.0, &["pascal", "pascals"]),
    UnitDef::linear("kPa", Pressure, 1e3, &["kilopascal", "kilopascals"]),
    UnitDef::linear("MPa", Pressure, 1e6, &["megapascal", "megapascals"]),
    UnitDef::linear("bar", Pressure, 1e5, &["bars"]),
    UnitDef::linear("psi", Pressure, 6_894.757_293_168, &["pounds per square inch"]),
    UnitDef::linear("atm", Pressure, 101_325.0, &["atmosphere", "atmospheres"]),
    // area (base m²)
    UnitDef::linear(
        "m²",
        Area,
        1.0,
        &["m2", "sq m", "sqm", "square meter", "square metre", "square meters", "square metres", "제곱미터"],
    ),
    UnitDef::linear("cm²", Area, 1e-4, &["cm2", "square centimeter", "square centimetre"]),
    UnitDef::linear("km²", Area, 1e6, &["km2", "square kilometer", "square kilometre", "sq km"]),
    UnitDef::linear("ha", Area, 1e4, &["hectare", "hectares", "헥타르"]),
    UnitDef::linear("acre", Area, 4_046.856_422_4, &["acres"]),
    UnitDef::linear("ft²", Area, 0.092_903_04, &["ft2", "sq ft", "square foot", "square feet"]),
    UnitDef::linear("평", Area, 3.305_785, &["pyeong"]),
    // temperature (base K, affine)
    UnitDef::affine("K", Temperature, 1.0, 0.0, &["kelvin"]),
    UnitDef::affine(
        "°C",
        Temperature,
        1.0,
        273.15,
        &["c", "celsius", "degc", "deg c", "degree celsius", "degrees celsius", "섭씨"],
    ),
    UnitDef::affine(
        "°F",
        Temperature,
        5.0 / 9.0,
        FAHRENHEIT_OFFSET,
        &["f", "fahrenheit", "degf", "deg f", "degree fahrenheit", "degrees fahrenheit", "화씨"],
    ),
    // currency (base USD). Static approximate rates; advisory only.
    UnitDef::linear("USD", Currency, 1.0, &["$", "us$", "dollar", "dollars", "달러"]),
    UnitDef::linear("EUR", Currency, 1.08, &["€", "euro", "euros", "유로"]),
    UnitDef::linear("GBP", Currency, 1.27, &["£", "sterling", "pound sterling", "pounds sterling"]),
    UnitDef::linear("JPY", Currency, 0.0067, &["¥", "yen", "엔"]),
    UnitDef::linear("KRW", Currency, 0.000_73, &["₩", "won", "원"]),
    UnitDef::linear("CNY", Currency, 0.14, &["rmb", "yuan", "위안"]),
    // count (base unit)
    UnitDef::linear(
        "unit",
        Count,
        1.0,
        &[
            "units", "number", "no", "ea", "each", "piece", "pcs", "pc", "item", "items", "count",
            "vehicle", "vehicles", "device", "devices", "passenger", "passengers", "person",
            "persons", "people", "개", "대", "명",
        ],
    ),
    UnitDef::linear("dozen", Count, 12.0, &["dozens", "다스"]),
    // percentage
    UnitDef::linear("%", Percentage, 1.0, &["percent", "pct", "퍼센트"]),
];
